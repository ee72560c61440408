use crate::{BrownConrady5, DistortionModel, IntrinsicsModel, PinholeIntrinsics, Pt2, Pt3, Vec2};
use serde::{Deserialize, Serialize};

/// Pinhole camera with Brown-Conrady lens distortion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeCamera {
    pub k: PinholeIntrinsics,
    pub dist: BrownConrady5,
}

impl PinholeCamera {
    pub fn new(k: PinholeIntrinsics, dist: BrownConrady5) -> Self {
        Self { k, dist }
    }

    /// Project a camera-frame point to pixels. `None` behind the camera.
    pub fn project_point(&self, p_cam: &Pt3) -> Option<Pt2> {
        if p_cam.z <= 0.0 {
            return None;
        }
        let n = Vec2::new(p_cam.x / p_cam.z, p_cam.y / p_cam.z);
        Some(self.project_normalized(&n))
    }

    /// Apply distortion and intrinsics to an ideal normalized coordinate.
    pub fn project_normalized(&self, n: &Vec2) -> Pt2 {
        self.k.normalized_to_pixel(&self.dist.distort(n))
    }
}
