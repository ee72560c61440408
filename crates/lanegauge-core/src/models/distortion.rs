use crate::{Real, Vec2};
use serde::{Deserialize, Serialize};

/// Lens distortion acting on normalized image coordinates.
pub trait DistortionModel {
    fn distort(&self, n_undist: &Vec2) -> Vec2;
    fn undistort(&self, n_dist: &Vec2) -> Vec2;
}

/// Five-parameter Brown-Conrady model (radial k1, k2, k3 and tangential p1, p2).
///
/// The coefficient vector order is `[k1, k2, p1, p2, k3]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConrady5 {
    pub k1: Real,
    pub k2: Real,
    pub k3: Real,
    pub p1: Real,
    pub p2: Real,
    /// Fixed-point iterations used by [`DistortionModel::undistort`]; 0 means 8.
    #[serde(default)]
    pub iters: u32,
}

impl BrownConrady5 {
    pub fn from_coeffs(coeffs: [Real; 5]) -> Self {
        Self {
            k1: coeffs[0],
            k2: coeffs[1],
            p1: coeffs[2],
            p2: coeffs[3],
            k3: coeffs[4],
            iters: 0,
        }
    }

    pub fn coeffs(&self) -> [Real; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs().iter().all(|c| *c == 0.0)
    }

    fn distort_impl(&self, x: Real, y: Real) -> (Real, Real) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let x_tan = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let y_tan = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;

        (x * radial + x_tan, y * radial + y_tan)
    }
}

impl DistortionModel for BrownConrady5 {
    fn distort(&self, n_undist: &Vec2) -> Vec2 {
        let (xd, yd) = self.distort_impl(n_undist.x, n_undist.y);
        Vec2::new(xd, yd)
    }

    fn undistort(&self, n_dist: &Vec2) -> Vec2 {
        let mut x = n_dist.x;
        let mut y = n_dist.y;

        let iters = if self.iters == 0 { 8 } else { self.iters };
        for _ in 0..iters {
            let (xd, yd) = self.distort_impl(x, y);
            x -= xd - n_dist.x;
            y -= yd - n_dist.y;
        }
        Vec2::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficient_order_matches_vector_layout() {
        let d = BrownConrady5::from_coeffs([0.1, -0.2, 0.001, 0.002, 0.03]);
        assert_eq!(d.k1, 0.1);
        assert_eq!(d.p1, 0.001);
        assert_eq!(d.k3, 0.03);
        assert_eq!(d.coeffs(), [0.1, -0.2, 0.001, 0.002, 0.03]);
    }

    #[test]
    fn undistort_inverts_mild_distortion() {
        let d = BrownConrady5 {
            k1: -0.12,
            k2: 0.03,
            k3: 0.0,
            p1: 0.001,
            p2: -0.0005,
            iters: 20,
        };
        let n = Vec2::new(0.2, -0.15);
        let back = d.undistort(&d.distort(&n));
        assert!((back - n).norm() < 1e-8, "residual {}", (back - n).norm());
    }
}
