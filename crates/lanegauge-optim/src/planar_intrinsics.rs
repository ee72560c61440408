//! Planar intrinsics refinement.
//!
//! Parameter layout of the full vector:
//! `[fx, fy, cx, cy, k1, k2, p1, p2, k3]` followed by six pose parameters per
//! view (axis-angle rotation, then translation). Entries excluded by an
//! [`IntrinsicsMask`] are held at their initial values.

use crate::{LmBackend, NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};
use lanegauge_core::{BrownConrady5, Iso3, PinholeCamera, PinholeIntrinsics, Pt2, Pt3, Real};
use log::{debug, info};
use nalgebra::{DVector, Translation3, UnitQuaternion, Vector3};
use thiserror::Error;

const N_INTRINSICS: usize = 9;
const POSE_DIM: usize = 6;
/// Residual assigned to each coordinate of a point that lands behind the camera.
const BEHIND_CAMERA_PENALTY: Real = 1e4;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RefineError {
    #[error("need at least one view for planar intrinsics")]
    EmptyViews,
    #[error("view {view} has mismatched 3D/2D points ({points_3d} vs {points_2d})")]
    MismatchedPointCounts {
        view: usize,
        points_3d: usize,
        points_2d: usize,
    },
    #[error("view {view} needs at least 4 points (got {points})")]
    NotEnoughPoints { view: usize, points: usize },
    #[error("expected {views} initial poses, got {poses}")]
    PoseCountMismatch { views: usize, poses: usize },
    #[error("optimizer produced a non-finite or invalid camera")]
    InvalidSolution,
}

/// Observations for a single image of the planar target.
#[derive(Debug, Clone)]
pub struct PlanarViewObservations {
    /// 3D points in board coordinates (z = 0).
    pub points_3d: Vec<Pt3>,
    /// Corresponding detected image points (pixels).
    pub points_2d: Vec<Pt2>,
}

impl PlanarViewObservations {
    pub fn new(points_3d: Vec<Pt3>, points_2d: Vec<Pt2>) -> Self {
        Self {
            points_3d,
            points_2d,
        }
    }

    pub fn len(&self) -> usize {
        self.points_3d.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points_3d.is_empty()
    }
}

/// Which intrinsic parameters stay at their initial values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntrinsicsMask {
    pub fix_principal_point: bool,
    pub fix_distortion: bool,
    pub fix_k3: bool,
}

impl IntrinsicsMask {
    fn is_fixed(&self, idx: usize) -> bool {
        match idx {
            2 | 3 => self.fix_principal_point,
            4..=7 => self.fix_distortion,
            8 => self.fix_distortion || self.fix_k3,
            _ => false,
        }
    }
}

/// Reprojection problem over the free subset of the full parameter vector.
#[derive(Debug, Clone)]
pub struct PlanarIntrinsicsProblem {
    views: Vec<PlanarViewObservations>,
    base: DVector<Real>,
    free: Vec<usize>,
}

impl PlanarIntrinsicsProblem {
    pub fn new(
        views: Vec<PlanarViewObservations>,
        camera: &PinholeCamera,
        poses: &[Iso3],
        mask: IntrinsicsMask,
    ) -> Result<Self, RefineError> {
        validate_views(&views)?;
        if poses.len() != views.len() {
            return Err(RefineError::PoseCountMismatch {
                views: views.len(),
                poses: poses.len(),
            });
        }
        let base = pack_params(camera, poses);
        let free = (0..base.len())
            .filter(|&i| i >= N_INTRINSICS || !mask.is_fixed(i))
            .collect();
        Ok(Self { views, base, free })
    }

    pub fn num_views(&self) -> usize {
        self.views.len()
    }

    /// Initial values of the free parameters.
    pub fn initial_free_params(&self) -> DVector<Real> {
        DVector::from_iterator(self.free.len(), self.free.iter().map(|&i| self.base[i]))
    }

    /// Scatter free parameters into a copy of the full vector.
    pub fn expand(&self, x: &DVector<Real>) -> DVector<Real> {
        let mut full = self.base.clone();
        for (k, &idx) in self.free.iter().enumerate() {
            full[idx] = x[k];
        }
        full
    }

    pub fn decode(&self, x: &DVector<Real>) -> (PinholeCamera, Vec<Iso3>) {
        decode_params(&self.expand(x), self.num_views())
    }
}

impl NllsProblem for PlanarIntrinsicsProblem {
    fn num_params(&self) -> usize {
        self.free.len()
    }

    fn num_residuals(&self) -> usize {
        self.views.iter().map(|v| 2 * v.len()).sum()
    }

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
        let (camera, poses) = self.decode(x);
        let mut r = DVector::zeros(self.num_residuals());
        let mut row = 0;
        for (view, pose) in self.views.iter().zip(poses.iter()) {
            for (pw, obs) in view.points_3d.iter().zip(view.points_2d.iter()) {
                let p_cam = pose.transform_point(pw);
                match camera.project_point(&p_cam) {
                    Some(uv) => {
                        r[row] = uv.x - obs.x;
                        r[row + 1] = uv.y - obs.y;
                    }
                    None => {
                        r[row] = BEHIND_CAMERA_PENALTY;
                        r[row + 1] = BEHIND_CAMERA_PENALTY;
                    }
                }
                row += 2;
            }
        }
        r
    }
}

/// Pack camera and poses into the full parameter vector.
pub fn pack_params(camera: &PinholeCamera, poses: &[Iso3]) -> DVector<Real> {
    let mut x = DVector::zeros(N_INTRINSICS + POSE_DIM * poses.len());
    x[0] = camera.k.fx;
    x[1] = camera.k.fy;
    x[2] = camera.k.cx;
    x[3] = camera.k.cy;
    let [k1, k2, p1, p2, k3] = camera.dist.coeffs();
    x[4] = k1;
    x[5] = k2;
    x[6] = p1;
    x[7] = p2;
    x[8] = k3;

    for (i, pose) in poses.iter().enumerate() {
        let idx = N_INTRINSICS + POSE_DIM * i;
        let axis_angle = pose.rotation.scaled_axis();
        let t = pose.translation.vector;
        x.rows_mut(idx, 3).copy_from(&axis_angle);
        x.rows_mut(idx + 3, 3).copy_from(&t);
    }
    x
}

/// Decode the full parameter vector into camera + per-view poses.
pub fn decode_params(x: &DVector<Real>, n_views: usize) -> (PinholeCamera, Vec<Iso3>) {
    let camera = PinholeCamera::new(
        PinholeIntrinsics {
            fx: x[0],
            fy: x[1],
            cx: x[2],
            cy: x[3],
            skew: 0.0,
        },
        BrownConrady5::from_coeffs([x[4], x[5], x[6], x[7], x[8]]),
    );

    let poses = (0..n_views)
        .map(|i| {
            let idx = N_INTRINSICS + POSE_DIM * i;
            let axis_angle = Vector3::new(x[idx], x[idx + 1], x[idx + 2]);
            let trans = Vector3::new(x[idx + 3], x[idx + 4], x[idx + 5]);
            Iso3::from_parts(
                Translation3::from(trans),
                UnitQuaternion::from_scaled_axis(axis_angle),
            )
        })
        .collect();

    (camera, poses)
}

/// Root-mean-square reprojection error in pixels over every observed point.
pub fn reprojection_rms(
    camera: &PinholeCamera,
    poses: &[Iso3],
    views: &[PlanarViewObservations],
) -> Real {
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for (view, pose) in views.iter().zip(poses.iter()) {
        for (pw, obs) in view.points_3d.iter().zip(view.points_2d.iter()) {
            let err2 = match camera.project_point(&pose.transform_point(pw)) {
                Some(uv) => (uv - obs).norm_squared(),
                None => 2.0 * BEHIND_CAMERA_PENALTY * BEHIND_CAMERA_PENALTY,
            };
            sum_sq += err2;
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    (sum_sq / count as Real).sqrt()
}

/// Result of a planar intrinsics refinement.
#[derive(Debug, Clone)]
pub struct PlanarIntrinsicsEstimate {
    pub camera: PinholeCamera,
    /// Board-to-camera pose per view.
    pub poses: Vec<Iso3>,
    pub rms: Real,
    pub report: SolveReport,
}

/// Refine intrinsics, distortion and poses by minimizing reprojection error.
pub fn refine_planar_intrinsics(
    views: Vec<PlanarViewObservations>,
    init_camera: &PinholeCamera,
    init_poses: &[Iso3],
    mask: IntrinsicsMask,
    opts: &SolveOptions,
) -> Result<PlanarIntrinsicsEstimate, RefineError> {
    let problem = PlanarIntrinsicsProblem::new(views, init_camera, init_poses, mask)?;
    debug!(
        "refining {} views, {} free parameters, {} residuals",
        problem.num_views(),
        problem.num_params(),
        problem.num_residuals()
    );

    let x0 = problem.initial_free_params();
    let (x_opt, report) = LmBackend.solve(&problem, x0, opts);
    let (camera, poses) = problem.decode(&x_opt);

    if !camera.k.is_valid() || camera.dist.coeffs().iter().any(|c| !c.is_finite()) {
        return Err(RefineError::InvalidSolution);
    }

    let rms = reprojection_rms(&camera, &poses, &problem.views);
    info!(
        "planar refinement: rms {:.4} px, converged {}, {} evaluations",
        rms, report.converged, report.evaluations
    );

    Ok(PlanarIntrinsicsEstimate {
        camera,
        poses,
        rms,
        report,
    })
}

fn validate_views(views: &[PlanarViewObservations]) -> Result<(), RefineError> {
    if views.is_empty() {
        return Err(RefineError::EmptyViews);
    }
    for (i, v) in views.iter().enumerate() {
        if v.points_3d.len() != v.points_2d.len() {
            return Err(RefineError::MismatchedPointCounts {
                view: i,
                points_3d: v.points_3d.len(),
                points_2d: v.points_2d.len(),
            });
        }
        if v.len() < 4 {
            return Err(RefineError::NotEnoughPoints {
                view: i,
                points: v.len(),
            });
        }
    }
    Ok(())
}
