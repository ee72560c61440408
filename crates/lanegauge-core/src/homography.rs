//! Pixel to ground-plane mapping.
//!
//! A [`GroundHomography`] maps homogeneous pixel coordinates `(u, v, 1)` to
//! homogeneous ground-plane coordinates. Construction rejects singular or
//! non-finite matrices, and every mapping checks the homogeneous weight.

use crate::{euclidean_distance, from_homogeneous, to_homogeneous, Mat3, Pt2, Real};
use thiserror::Error;

/// Relative determinant threshold below which a matrix is treated as singular.
const SINGULAR_REL_EPS: Real = 1e-12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MappingError {
    /// The matrix holds NaN or infinite entries.
    #[error("homography contains non-finite entries")]
    NonFinite,
    /// The matrix is not invertible.
    #[error("homography is singular (det = {det:e})")]
    Singular { det: Real },
    /// The pixel lies on the line mapped to infinity.
    #[error("homogeneous weight is zero when mapping pixel ({x}, {y})")]
    ZeroWeight { x: Real, y: Real },
}

/// Invertible plane-to-plane projective transform, pixels to ground units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHomography {
    matrix: Mat3,
}

impl GroundHomography {
    pub fn new(matrix: Mat3) -> Result<Self, MappingError> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(MappingError::NonFinite);
        }
        let det = matrix.determinant();
        let scale = matrix.norm().powi(3);
        if det == 0.0 || det.abs() <= SINGULAR_REL_EPS * scale {
            return Err(MappingError::Singular { det });
        }
        Ok(Self { matrix })
    }

    pub fn matrix(&self) -> &Mat3 {
        &self.matrix
    }

    /// Map a pixel to ground-plane coordinates.
    pub fn map_pixel(&self, pixel: &Pt2) -> Result<Pt2, MappingError> {
        let mapped = self.matrix * to_homogeneous(pixel);
        from_homogeneous(&mapped).ok_or(MappingError::ZeroWeight {
            x: pixel.x,
            y: pixel.y,
        })
    }

    /// Ground-plane distance between two pixels.
    pub fn ground_distance(&self, a: &Pt2, b: &Pt2) -> Result<Real, MappingError> {
        let wa = self.map_pixel(a)?;
        let wb = self.map_pixel(b)?;
        Ok(euclidean_distance(&wa, &wb))
    }
}
