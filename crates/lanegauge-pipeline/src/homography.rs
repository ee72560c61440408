use crate::PipelineError;
use anyhow::Result;
use lanegauge_core::{GroundHomography, Pt2, Real};
use lanegauge_linear::HomographySolver;
use log::debug;
use serde::{Deserialize, Serialize};

/// One pixel paired with its ground-plane position (centimetres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPair {
    pub pixel: Pt2,
    pub world: Pt2,
}

impl PointPair {
    pub fn new(pixel: Pt2, world: Pt2) -> Self {
        Self { pixel, world }
    }
}

/// Anything that can supply pixel/ground correspondences, such as an
/// interactive picker or a stored survey.
pub trait CorrespondenceSource {
    fn correspondences(&self) -> Result<Vec<PointPair>>;
}

impl CorrespondenceSource for [PointPair] {
    fn correspondences(&self) -> Result<Vec<PointPair>> {
        Ok(self.to_vec())
    }
}

impl CorrespondenceSource for Vec<PointPair> {
    fn correspondences(&self) -> Result<Vec<PointPair>> {
        Ok(self.clone())
    }
}

/// A rectangular board lying on the road, seen in the image.
///
/// `corners_px` are picked clockwise starting at the board origin; they
/// map to `(0, 0)`, `(width, 0)`, `(width, height)` and `(0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangleBoard {
    pub corners_px: [Pt2; 4],
    pub width_cm: Real,
    pub height_cm: Real,
}

impl RectangleBoard {
    pub const DEFAULT_WIDTH_CM: Real = 70.0;
    pub const DEFAULT_HEIGHT_CM: Real = 200.0;

    pub fn new(corners_px: [Pt2; 4]) -> Self {
        Self::with_extent(corners_px, Self::DEFAULT_WIDTH_CM, Self::DEFAULT_HEIGHT_CM)
    }

    pub fn with_extent(corners_px: [Pt2; 4], width_cm: Real, height_cm: Real) -> Self {
        Self {
            corners_px,
            width_cm,
            height_cm,
        }
    }

    pub fn world_corners(&self) -> [Pt2; 4] {
        [
            Pt2::new(0.0, 0.0),
            Pt2::new(self.width_cm, 0.0),
            Pt2::new(self.width_cm, self.height_cm),
            Pt2::new(0.0, self.height_cm),
        ]
    }
}

impl CorrespondenceSource for RectangleBoard {
    fn correspondences(&self) -> Result<Vec<PointPair>> {
        Ok(self
            .corners_px
            .iter()
            .zip(self.world_corners())
            .map(|(px, w)| PointPair::new(*px, w))
            .collect())
    }
}

/// Pixel to ground-plane homography from four or more correspondences.
///
/// Exactly four pairs give the exact perspective transform, more give a
/// least-squares fit. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomographyEstimator;

impl HomographyEstimator {
    pub fn estimate(&self, pairs: &[PointPair]) -> Result<GroundHomography, PipelineError> {
        let pixels: Vec<Pt2> = pairs.iter().map(|p| p.pixel).collect();
        let world: Vec<Pt2> = pairs.iter().map(|p| p.world).collect();
        let h = HomographySolver::estimate(&pixels, &world)?;
        debug!("ground homography from {} pairs", pairs.len());
        Ok(GroundHomography::new(h)?)
    }

    pub fn estimate_from<S: CorrespondenceSource + ?Sized>(
        &self,
        source: &S,
    ) -> Result<GroundHomography> {
        let pairs = source.correspondences()?;
        Ok(self.estimate(&pairs)?)
    }
}

/// Ground distance between two pixels, e.g. to check a board edge.
pub fn ground_distance(h: &GroundHomography, a: &Pt2, b: &Pt2) -> Result<Real, PipelineError> {
    Ok(h.ground_distance(a, b)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanegauge_core::Mat3;
    use lanegauge_linear::HomographyError;

    fn board() -> RectangleBoard {
        RectangleBoard::new([
            Pt2::new(420.0, 610.0),
            Pt2::new(560.0, 612.0),
            Pt2::new(600.0, 300.0),
            Pt2::new(470.0, 298.0),
        ])
    }

    #[test]
    fn rectangle_round_trips_to_centimetres() {
        let b = board();
        let h = HomographyEstimator.estimate_from(&b).unwrap();
        for (px, w) in b.corners_px.iter().zip(b.world_corners()) {
            let mapped = h.map_pixel(px).unwrap();
            assert!((mapped - w).norm() < 1e-3, "{mapped} vs {w}");
        }
        let edge = ground_distance(&h, &b.corners_px[0], &b.corners_px[1]).unwrap();
        assert!((edge - 70.0).abs() < 1e-3);
        let side = ground_distance(&h, &b.corners_px[1], &b.corners_px[2]).unwrap();
        assert!((side - 200.0).abs() < 1e-3);
    }

    #[test]
    fn least_squares_with_extra_pairs() {
        let truth = Mat3::new(0.5, 0.02, -10.0, 0.01, 0.6, 4.0, 0.0002, 0.0001, 1.0);
        let h_truth = GroundHomography::new(truth).unwrap();
        let pairs: Vec<PointPair> = [
            (10.0, 20.0),
            (300.0, 25.0),
            (310.0, 240.0),
            (15.0, 230.0),
            (160.0, 120.0),
            (90.0, 200.0),
        ]
        .iter()
        .map(|&(x, y)| {
            let px = Pt2::new(x, y);
            PointPair::new(px, h_truth.map_pixel(&px).unwrap())
        })
        .collect();
        let h = HomographyEstimator.estimate_from(&pairs).unwrap();
        let check_px = Pt2::new(200.0, 100.0);
        let err = (h.map_pixel(&check_px).unwrap() - h_truth.map_pixel(&check_px).unwrap()).norm();
        assert!(err < 1e-6);
    }

    #[test]
    fn degenerate_inputs_are_errors() {
        let collinear: Vec<PointPair> = (0..4)
            .map(|i| {
                let t = i as Real;
                PointPair::new(Pt2::new(t, 2.0 * t), Pt2::new(t, t))
            })
            .collect();
        assert!(matches!(
            HomographyEstimator.estimate(&collinear),
            Err(PipelineError::Homography(HomographyError::Degenerate(_)))
        ));
        assert!(matches!(
            HomographyEstimator.estimate(&collinear[..3]),
            Err(PipelineError::Homography(HomographyError::NotEnoughPoints(3)))
        ));
    }
}
