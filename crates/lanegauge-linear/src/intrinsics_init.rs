use lanegauge_core::{ImageSize, Mat3, PinholeIntrinsics, Real};
use nalgebra::{DMatrix, DVector, SVector, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntrinsicsInitError {
    #[error("need at least {need} homographies, got {got}")]
    NotEnoughViews { need: usize, got: usize },
    #[error("degenerate configuration in intrinsics estimation: {0}")]
    Degenerate(&'static str),
    #[error("svd failed")]
    SvdFailed,
}

/// Build the 6-vector v_ij(H) as in Zhang's method (0-based column indices).
fn v_ij(hmtx: &Mat3, i: usize, j: usize) -> SVector<Real, 6> {
    let hi = hmtx.column(i);
    let hj = hmtx.column(j);

    SVector::<Real, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Estimate camera intrinsics K from plane homographies using Zhang's
/// closed-form solution (no distortion).
///
/// Requires at least 3 homographies.
pub fn estimate_intrinsics_from_homographies(
    hmtxs: &[Mat3],
) -> Result<PinholeIntrinsics, IntrinsicsInitError> {
    if hmtxs.len() < 3 {
        return Err(IntrinsicsInitError::NotEnoughViews {
            need: 3,
            got: hmtxs.len(),
        });
    }

    let m = hmtxs.len();
    let mut vmtx = DMatrix::<Real>::zeros((2 * m).max(6), 6);

    for (k, hmtx) in hmtxs.iter().enumerate() {
        let v11 = v_ij(hmtx, 0, 0);
        let v22 = v_ij(hmtx, 1, 1);
        let v12 = v_ij(hmtx, 0, 1);

        vmtx.row_mut(2 * k).copy_from(&v12.transpose());
        vmtx.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }

    let svd = vmtx.svd(false, true);
    let v_t = svd.v_t.ok_or(IntrinsicsInitError::SvdFailed)?;
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
    let b = v_t.row(min_idx);

    let b11 = b[0];
    let b12 = b[1];
    let b22 = b[2];
    let b13 = b[3];
    let b23 = b[4];
    let b33 = b[5];

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    let denom_rel = if denom_norm > 0.0 {
        denom.abs() / denom_norm
    } else {
        0.0
    };
    if denom_rel <= 1e-6 {
        return Err(IntrinsicsInitError::Degenerate("image of the absolute conic is rank deficient"));
    }

    let v0 = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + v0 * (b12 * b13 - b11 * b23)) / b11;

    let alpha2 = lambda / b11;
    let beta2 = lambda * b11 / denom;
    if !(alpha2 > 0.0 && beta2 > 0.0) {
        return Err(IntrinsicsInitError::Degenerate("invalid sign for lambda"));
    }

    let alpha = alpha2.sqrt();
    let beta = beta2.sqrt();
    let gamma = -b12 * alpha * alpha * beta / lambda;
    let u0 = gamma * v0 / beta - b13 * alpha * alpha / lambda;

    let k = PinholeIntrinsics {
        fx: alpha,
        fy: beta,
        cx: u0,
        cy: v0,
        skew: gamma,
    };
    if !k.is_valid() {
        return Err(IntrinsicsInitError::Degenerate("non-finite intrinsics"));
    }
    Ok(k)
}

/// Smallest accepted singular value ratio of the focal-length system.
const CONDITION_EPS: Real = 1e-6;

/// Estimate focal lengths with the principal point fixed at the image centre.
///
/// Each homography contributes two linear constraints on `(1/fx², 1/fy²)`:
/// orthogonality of the first two rotation columns and orthogonality of their
/// sum and difference. A single tilted view is enough.
pub fn estimate_focal_fixed_center(
    hmtxs: &[Mat3],
    image_size: ImageSize,
) -> Result<PinholeIntrinsics, IntrinsicsInitError> {
    if hmtxs.is_empty() {
        return Err(IntrinsicsInitError::NotEnoughViews { need: 1, got: 0 });
    }
    let cx = (image_size.width as Real - 1.0) * 0.5;
    let cy = (image_size.height as Real - 1.0) * 0.5;

    let m = hmtxs.len();
    let mut a = DMatrix::<Real>::zeros(2 * m, 2);
    let mut b = DVector::<Real>::zeros(2 * m);

    for (k, hmtx) in hmtxs.iter().enumerate() {
        let mut h = *hmtx;
        for c in 0..3 {
            h[(0, c)] -= h[(2, c)] * cx;
            h[(1, c)] -= h[(2, c)] * cy;
        }
        let col0: Vector3<Real> = h.column(0).into_owned();
        let col1: Vector3<Real> = h.column(1).into_owned();
        let d1 = (col0 + col1) * 0.5;
        let d2 = (col0 - col1) * 0.5;

        let (Some(hn), Some(vn), Some(d1n), Some(d2n)) = (
            unit(&col0),
            unit(&col1),
            unit(&d1),
            unit(&d2),
        ) else {
            return Err(IntrinsicsInitError::Degenerate("zero homography column"));
        };

        a[(2 * k, 0)] = hn.x * vn.x;
        a[(2 * k, 1)] = hn.y * vn.y;
        a[(2 * k + 1, 0)] = d1n.x * d2n.x;
        a[(2 * k + 1, 1)] = d1n.y * d2n.y;
        b[2 * k] = -hn.z * vn.z;
        b[2 * k + 1] = -d1n.z * d2n.z;
    }

    let svd = a.svd(true, true);
    let sv = &svd.singular_values;
    if sv.min() <= CONDITION_EPS * sv.max() {
        return Err(IntrinsicsInitError::Degenerate("fronto-parallel views"));
    }
    let f = svd
        .solve(&b, 1e-12)
        .map_err(|_| IntrinsicsInitError::SvdFailed)?;
    let (inv_fx2, inv_fy2) = (f[0].abs(), f[1].abs());
    if !(inv_fx2 > 1e-18 && inv_fy2 > 1e-18) {
        return Err(IntrinsicsInitError::Degenerate("fronto-parallel views"));
    }

    let k = PinholeIntrinsics {
        fx: (1.0 / inv_fx2).sqrt(),
        fy: (1.0 / inv_fy2).sqrt(),
        cx,
        cy,
        skew: 0.0,
    };
    if !k.is_valid() {
        return Err(IntrinsicsInitError::Degenerate("non-finite focal length"));
    }
    Ok(k)
}

fn unit(v: &Vector3<Real>) -> Option<Vector3<Real>> {
    let n = v.norm();
    if n > Real::EPSILON {
        Some(v / n)
    } else {
        None
    }
}
