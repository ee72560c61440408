use lanegauge_core::{Iso3, Mat3, Real};
use nalgebra::{Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoseError {
    #[error("intrinsics matrix is not invertible")]
    SingularIntrinsics,
    #[error("homography columns vanish after removing intrinsics")]
    DegenerateHomography,
    #[error("svd failed")]
    SvdFailed,
}

/// Linear pose initialisation from a homography and intrinsics.
///
/// Decomposes a plane-induced homography `H ~ K [r1 r2 t]` for a target lying
/// on `Z = 0` in its own frame.
#[derive(Debug, Clone, Copy)]
pub struct PlanarPoseSolver;

impl PlanarPoseSolver {
    /// Decompose a homography into the pose `T_C_B` (board to camera).
    ///
    /// The sign of `H` is resolved so the board lies in front of the camera.
    pub fn from_homography(kmtx: &Mat3, hmtx: &Mat3) -> Result<Iso3, PoseError> {
        let k_inv = kmtx.try_inverse().ok_or(PoseError::SingularIntrinsics)?;

        let k_inv_h1 = k_inv * hmtx.column(0);
        let k_inv_h2 = k_inv * hmtx.column(1);
        let k_inv_h3 = k_inv * hmtx.column(2);

        // Scale from the mean norm of the first two columns.
        let mean_norm = (k_inv_h1.norm() + k_inv_h2.norm()) * 0.5;
        if mean_norm <= Real::EPSILON {
            return Err(PoseError::DegenerateHomography);
        }
        let mut lambda = 1.0 / mean_norm;
        if k_inv_h3.z * lambda < 0.0 {
            lambda = -lambda;
        }

        let r1: Vector3<Real> = k_inv_h1 * lambda;
        let r2: Vector3<Real> = k_inv_h2 * lambda;
        let r3 = r1.cross(&r2);

        let mut r_mat = Matrix3::<Real>::zeros();
        r_mat.set_column(0, &r1);
        r_mat.set_column(1, &r2);
        r_mat.set_column(2, &r3);

        // Project onto SO(3).
        let svd = r_mat.svd(true, true);
        let u = svd.u.ok_or(PoseError::SvdFailed)?;
        let v_t = svd.v_t.ok_or(PoseError::SvdFailed)?;
        let mut r_orth = u * v_t;
        if r_orth.determinant() < 0.0 {
            let mut u_flipped = u;
            u_flipped.column_mut(2).neg_mut();
            r_orth = u_flipped * v_t;
        }

        let t_vec: Vector3<Real> = k_inv_h3 * lambda;
        let rot = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r_orth));
        Ok(Iso3::from_parts(Translation3::from(t_vec), rot))
    }
}
