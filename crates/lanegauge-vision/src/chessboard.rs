//! Chessboard inner-corner detection.
//!
//! Corners come from `calib-targets` (ChESS response plus grid assembly on
//! top of `chess-corners`, with sub-pixel positions). This module only
//! fixes the corner order to row-major with x fastest, matching
//! [`lanegauge_core::synthetic::planar::grid_points`].

use calib_targets::{chessboard::ChessboardParams, detect};
use chess_corners::DetectorConfig;
use image::GrayImage;
use lanegauge_core::{Pt2, Real};
use serde::{Deserialize, Serialize};

/// Number of inner corners per row (`cols`) and per column (`rows`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternSize {
    pub cols: usize,
    pub rows: usize,
}

impl PatternSize {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }

    pub fn corner_count(&self) -> usize {
        self.cols * self.rows
    }
}

/// Finds the calibration pattern in a grayscale image.
///
/// Implementations return exactly `size.corner_count()` corners ordered
/// row-major (x fastest), or `None` when the full pattern is not visible.
pub trait PatternDetector {
    fn detect(&self, image: &GrayImage, size: PatternSize) -> Option<Vec<Pt2>>;
}

/// [`PatternDetector`] backed by `calib_targets::detect::detect_chessboard`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChessboardDetector;

impl PatternDetector for ChessboardDetector {
    fn detect(&self, image: &GrayImage, size: PatternSize) -> Option<Vec<Pt2>> {
        if size.cols < 2 || size.rows < 2 {
            return None;
        }
        let board_params = ChessboardParams::default();
        let detection =
            detect::detect_chessboard(image, &DetectorConfig::default(), &board_params).ok()?;

        let labelled: Vec<GridCorner> = detection
            .corners
            .into_iter()
            .filter_map(|corner| {
                let grid = corner.grid;
                Some(GridCorner {
                    i: grid.u as i64,
                    j: grid.v as i64,
                    position: Pt2::new(corner.position.x as Real, corner.position.y as Real),
                })
            })
            .collect();

        let ordered = order_grid(&labelled, size);
        if ordered.is_none() {
            log::debug!(
                "chessboard: {} labelled corners do not form a {}x{} grid",
                labelled.len(),
                size.cols,
                size.rows
            );
        }
        ordered
    }
}

/// A detected corner with its integer board coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCorner {
    pub i: i64,
    pub j: i64,
    pub position: Pt2,
}

/// Arrange labelled corners as a full `cols x rows` grid in canonical order:
/// row-major, right-handed in image coordinates, first corner nearest the
/// image origin. Either grid axis may run along the pattern columns.
pub fn order_grid(corners: &[GridCorner], size: PatternSize) -> Option<Vec<Pt2>> {
    if corners.len() != size.corner_count() || size.cols < 2 || size.rows < 2 {
        return None;
    }
    let imin = corners.iter().map(|c| c.i).min()?;
    let jmin = corners.iter().map(|c| c.j).min()?;
    let ni = (corners.iter().map(|c| c.i).max()? - imin + 1) as usize;
    let nj = (corners.iter().map(|c| c.j).max()? - jmin + 1) as usize;

    let transposed = if ni == size.cols && nj == size.rows {
        false
    } else if ni == size.rows && nj == size.cols {
        true
    } else {
        return None;
    };

    let mut slots: Vec<Option<Pt2>> = vec![None; size.corner_count()];
    for c in corners {
        let (i, j) = ((c.i - imin) as usize, (c.j - jmin) as usize);
        let (col, row) = if transposed { (j, i) } else { (i, j) };
        let slot = &mut slots[row * size.cols + col];
        if slot.is_some() {
            return None;
        }
        *slot = Some(c.position);
    }
    let mut rows: Vec<Vec<Pt2>> = slots
        .chunks(size.cols)
        .map(|row| row.iter().copied().collect::<Option<Vec<_>>>())
        .collect::<Option<_>>()?;

    let along_row = rows[0][1] - rows[0][0];
    let along_col = rows[1][0] - rows[0][0];
    if along_row.perp(&along_col) < 0.0 {
        rows.reverse();
    }
    let first = rows[0][0];
    let last = rows[size.rows - 1][size.cols - 1];
    if last.x + last.y < first.x + first.y {
        rows.reverse();
        for row in rows.iter_mut() {
            row.reverse();
        }
    }
    Some(rows.into_iter().flatten().collect())
}
