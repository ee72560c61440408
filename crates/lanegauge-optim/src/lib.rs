//! Non-linear optimization for camera calibration.
//!
//! [`NllsProblem`] describes a dense least-squares problem, [`LmBackend`]
//! solves it with the `levenberg-marquardt` crate, and
//! [`planar_intrinsics`] holds the reprojection problem over intrinsics,
//! distortion and per-view board poses.

pub mod backend_lm;
pub mod planar_intrinsics;
pub mod problem;

pub use backend_lm::LmBackend;
pub use problem::*;
