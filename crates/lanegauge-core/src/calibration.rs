use crate::{BrownConrady5, Mat3, PinholeCamera, PinholeIntrinsics, Real};
use serde::{Deserialize, Serialize};

/// Image extent in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Output of an intrinsic calibration run. Immutable once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub camera: PinholeCamera,
    /// Reprojection RMS in pixels.
    pub rms: Real,
    pub image_size: ImageSize,
    pub images_used: usize,
}

impl CalibrationResult {
    pub fn camera_matrix(&self) -> Mat3 {
        self.camera.k.k_matrix()
    }

    /// Distortion vector `[k1, k2, p1, p2, k3]`.
    pub fn dist_coeffs(&self) -> [Real; 5] {
        self.camera.dist.coeffs()
    }

    pub fn from_parts(
        camera_matrix: &Mat3,
        dist_coeffs: [Real; 5],
        rms: Real,
        image_size: ImageSize,
        images_used: usize,
    ) -> Self {
        Self {
            camera: PinholeCamera::new(
                PinholeIntrinsics::from_k_matrix(camera_matrix),
                BrownConrady5::from_coeffs(dist_coeffs),
            ),
            rms,
            image_size,
            images_used,
        }
    }
}
