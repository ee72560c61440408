use crate::math::{normalize_points_2d, spread_ratio, triangle_area2};
use lanegauge_core::{Mat3, Pt2, Real};
use log::debug;
use nalgebra::{DMatrix, SMatrix, SVector};
use thiserror::Error;

/// Area threshold (in normalized coordinates) below which three points are collinear.
const COLLINEAR_EPS: Real = 1e-9;
/// Relative determinant threshold for a usable homography.
const SINGULAR_REL_EPS: Real = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HomographyError {
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("point count mismatch: {src} source vs {dst} destination points")]
    MismatchedLengths { src: usize, dst: usize },
    #[error("correspondence {0} has non-finite coordinates")]
    NonFinite(usize),
    #[error("degenerate point configuration: {0}")]
    Degenerate(&'static str),
    #[error("svd failed")]
    SvdFailed,
}

/// Plane-to-plane homography estimation (`dst ~ H src`).
#[derive(Debug, Clone, Copy)]
pub struct HomographySolver;

impl HomographySolver {
    /// Estimate a homography from `n >= 4` correspondences.
    ///
    /// Exactly four pairs use the exact perspective solve; more pairs use the
    /// least-squares normalized DLT. The result is scaled so `H[2,2] = 1`.
    pub fn estimate(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
        validate_input(src, dst)?;
        if src.len() == 4 {
            Self::exact(src, dst)
        } else {
            Self::dlt(src, dst)
        }
    }

    /// Exact solve for four correspondences, no three of which may be collinear.
    pub fn exact(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
        validate_input(src, dst)?;
        if src.len() != 4 {
            return Err(HomographyError::NotEnoughPoints(src.len()));
        }
        let (src_n, t_src) = normalize_points_2d(src)
            .ok_or(HomographyError::Degenerate("source points coincide"))?;
        let (dst_n, t_dst) = normalize_points_2d(dst)
            .ok_or(HomographyError::Degenerate("destination points coincide"))?;
        if has_collinear_triple(&src_n) || has_collinear_triple(&dst_n) {
            return Err(HomographyError::Degenerate("three points are collinear"));
        }

        // h33 fixed to 1: A h = b with 8 unknowns.
        let mut a = SMatrix::<Real, 8, 8>::zeros();
        let mut b = SVector::<Real, 8>::zeros();
        for (i, (s, d)) in src_n.iter().zip(dst_n.iter()).enumerate() {
            let r0 = 2 * i;
            let r1 = r0 + 1;
            a[(r0, 0)] = s.x;
            a[(r0, 1)] = s.y;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -d.x * s.x;
            a[(r0, 7)] = -d.x * s.y;
            b[r0] = d.x;

            a[(r1, 3)] = s.x;
            a[(r1, 4)] = s.y;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -d.y * s.x;
            a[(r1, 7)] = -d.y * s.y;
            b[r1] = d.y;
        }
        let h = a
            .lu()
            .solve(&b)
            .ok_or(HomographyError::Degenerate("singular perspective system"))?;

        let hn = Mat3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        finish(hn, &t_src, &t_dst)
    }

    /// Least-squares normalized DLT for `n >= 4` correspondences.
    pub fn dlt(src: &[Pt2], dst: &[Pt2]) -> Result<Mat3, HomographyError> {
        validate_input(src, dst)?;
        let (src_n, t_src) = normalize_points_2d(src)
            .ok_or(HomographyError::Degenerate("source points coincide"))?;
        let (dst_n, t_dst) = normalize_points_2d(dst)
            .ok_or(HomographyError::Degenerate("destination points coincide"))?;
        if spread_ratio(&src_n) < COLLINEAR_EPS || spread_ratio(&dst_n) < COLLINEAR_EPS {
            return Err(HomographyError::Degenerate("all points are collinear"));
        }

        let n = src_n.len();
        let rows = (2 * n).max(9);
        let mut a = DMatrix::<Real>::zeros(rows, 9);
        for (i, (s, d)) in src_n.iter().zip(dst_n.iter()).enumerate() {
            let r0 = 2 * i;
            let r1 = r0 + 1;

            a[(r0, 0)] = -s.x;
            a[(r0, 1)] = -s.y;
            a[(r0, 2)] = -1.0;
            a[(r0, 6)] = d.x * s.x;
            a[(r0, 7)] = d.x * s.y;
            a[(r0, 8)] = d.x;

            a[(r1, 3)] = -s.x;
            a[(r1, 4)] = -s.y;
            a[(r1, 5)] = -1.0;
            a[(r1, 6)] = d.y * s.x;
            a[(r1, 7)] = d.y * s.y;
            a[(r1, 8)] = d.y;
        }

        // Solve A h = 0 via SVD (smallest singular value).
        let svd = a.svd(false, true);
        let v_t = svd.v_t.ok_or(HomographyError::SvdFailed)?;
        let (min_idx, _) = svd
            .singular_values
            .iter()
            .enumerate()
            .fold((0, Real::INFINITY), |best, (i, &s)| {
                if s < best.1 {
                    (i, s)
                } else {
                    best
                }
            });
        let h = v_t.row(min_idx);
        let hn = Mat3::from_fn(|r, c| h[3 * r + c]);
        finish(hn, &t_src, &t_dst)
    }
}

fn validate_input(src: &[Pt2], dst: &[Pt2]) -> Result<(), HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::MismatchedLengths {
            src: src.len(),
            dst: dst.len(),
        });
    }
    if src.len() < 4 {
        return Err(HomographyError::NotEnoughPoints(src.len()));
    }
    for (i, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        if !(s.x.is_finite() && s.y.is_finite() && d.x.is_finite() && d.y.is_finite()) {
            return Err(HomographyError::NonFinite(i));
        }
    }
    Ok(())
}

fn has_collinear_triple(points: &[Pt2]) -> bool {
    let n = points.len();
    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if triangle_area2(&points[i], &points[j], &points[k]).abs() < COLLINEAR_EPS {
                    return true;
                }
            }
        }
    }
    false
}

/// Undo the normalization and fix the scale.
fn finish(hn: Mat3, t_src: &Mat3, t_dst: &Mat3) -> Result<Mat3, HomographyError> {
    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or(HomographyError::Degenerate("normalization not invertible"))?;
    let mut h = t_dst_inv * hn * t_src;

    if h.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::Degenerate("non-finite homography"));
    }
    let norm = h.norm();
    if norm <= Real::EPSILON {
        return Err(HomographyError::Degenerate("zero homography"));
    }
    h /= norm;
    let det = h.determinant();
    if det.abs() <= SINGULAR_REL_EPS {
        return Err(HomographyError::Degenerate("singular homography"));
    }

    let scale = h[(2, 2)];
    if scale.abs() > Real::EPSILON {
        h /= scale;
    }
    debug!("homography estimated, det = {:.3e}", h.determinant());
    Ok(h)
}
