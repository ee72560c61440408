//! Linear solvers used to initialise calibration and ground-plane mapping.
//!
//! - [`HomographySolver`]: exact four-point and least-squares normalized DLT.
//! - [`estimate_intrinsics_from_homographies`]: Zhang's closed form.
//! - [`estimate_focal_fixed_center`]: focal lengths with the principal point
//!   pinned to the image centre, usable from a single view.
//! - [`PlanarPoseSolver`]: board pose from a homography and intrinsics.

pub mod math;

mod homography;
mod intrinsics_init;
mod planar_pose;

pub use homography::*;
pub use intrinsics_init::*;
pub use planar_pose::*;
