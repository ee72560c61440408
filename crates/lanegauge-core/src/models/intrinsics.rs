use crate::{Mat3, Pt2, Real, Vec2};
use serde::{Deserialize, Serialize};

/// Intrinsics that map normalized image-plane coordinates to pixel coordinates.
pub trait IntrinsicsModel {
    /// Convert normalized coordinates into pixel coordinates.
    fn normalized_to_pixel(&self, n: &Vec2) -> Pt2;
    /// Convert pixel coordinates into normalized coordinates.
    fn pixel_to_normalized(&self, pixel: &Pt2) -> Vec2;
}

/// Standard pinhole intrinsics with optional skew.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    /// Focal length in pixels along X.
    pub fx: Real,
    /// Focal length in pixels along Y.
    pub fy: Real,
    /// Principal point X coordinate in pixels.
    pub cx: Real,
    /// Principal point Y coordinate in pixels.
    pub cy: Real,
    /// Skew term (0 for every camera calibrated here).
    #[serde(default)]
    pub skew: Real,
}

impl PinholeIntrinsics {
    /// Return the 3x3 camera intrinsics matrix K.
    pub fn k_matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Read intrinsics back from an upper-triangular K.
    pub fn from_k_matrix(k: &Mat3) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            skew: k[(0, 1)],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx > 0.0
            && self.fy > 0.0
    }
}

impl IntrinsicsModel for PinholeIntrinsics {
    fn normalized_to_pixel(&self, n: &Vec2) -> Pt2 {
        let u = self.fx * n.x + self.skew * n.y + self.cx;
        let v = self.fy * n.y + self.cy;
        Pt2::new(u, v)
    }

    fn pixel_to_normalized(&self, pixel: &Pt2) -> Vec2 {
        let ny = (pixel.y - self.cy) / self.fy;
        let nx = (pixel.x - self.cx - self.skew * ny) / self.fx;
        Vec2::new(nx, ny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_matrix_round_trip() {
        let k = PinholeIntrinsics {
            fx: 800.0,
            fy: 780.0,
            cx: 640.0,
            cy: 360.0,
            skew: 0.5,
        };
        assert_eq!(PinholeIntrinsics::from_k_matrix(&k.k_matrix()), k);
    }

    #[test]
    fn normalized_pixel_inverse() {
        let k = PinholeIntrinsics {
            fx: 500.0,
            fy: 510.0,
            cx: 320.0,
            cy: 240.0,
            skew: 0.0,
        };
        let px = Pt2::new(100.0, 400.0);
        let back = k.normalized_to_pixel(&k.pixel_to_normalized(&px));
        assert!((back - px).norm() < 1e-9);
    }
}
