//! Synthetic planar target helpers.
//!
//! The functions here build planar point grids (Z=0), generate simple camera
//! poses, and project the target into a [`PinholeCamera`].

use crate::{Iso3, PinholeCamera, Pt2, Pt3, Real};
use anyhow::Result;
use nalgebra::{Translation3, UnitQuaternion, Vector3};

/// Generate a planar grid of 3D points (Z=0) with `nx * ny` points.
///
/// Points are ordered row-major with X fastest, matching the corner order
/// produced by pattern detectors.
pub fn grid_points(nx: usize, ny: usize, spacing: Real) -> Vec<Pt3> {
    let mut points = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            points.push(Pt3::new(i as Real * spacing, j as Real * spacing, 0.0));
        }
    }
    points
}

/// Generate `n_views` poses with a yaw rotation around the +Y axis and a Z translation ramp.
pub fn poses_yaw_y_z(
    n_views: usize,
    yaw_start_rad: Real,
    yaw_step_rad: Real,
    z_start: Real,
    z_step: Real,
) -> Vec<Iso3> {
    (0..n_views)
        .map(|view_idx| {
            let yaw = yaw_start_rad + yaw_step_rad * view_idx as Real;
            let rotation = UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 1.0, 0.0) * yaw);
            let translation = Vector3::new(0.0, 0.0, z_start + z_step * view_idx as Real);
            Iso3::from_parts(Translation3::from(translation), rotation)
        })
        .collect()
}

/// Pose of a board whose centre sits `distance` in front of the camera,
/// tilted by `roll`, `pitch` and `yaw` (radians).
pub fn centred_board_pose(
    board_w: Real,
    board_h: Real,
    distance: Real,
    roll: Real,
    pitch: Real,
    yaw: Real,
) -> Iso3 {
    let rotation = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
    let centre = Vector3::new(board_w * 0.5, board_h * 0.5, 0.0);
    let translation = Vector3::new(0.0, 0.0, distance) - rotation * centre;
    Iso3::from_parts(Translation3::from(translation), rotation)
}

/// Project a planar target into the camera, requiring every point to be projectable.
///
/// `cam_from_target` must map target-frame points into the camera frame.
pub fn project_view_all(
    camera: &PinholeCamera,
    cam_from_target: &Iso3,
    target_points: &[Pt3],
) -> Result<Vec<Pt2>> {
    let mut pixels = Vec::with_capacity(target_points.len());
    for (idx, pw) in target_points.iter().enumerate() {
        let pc = cam_from_target.transform_point(pw);
        let Some(uv) = camera.project_point(&pc) else {
            anyhow::bail!("point {idx} not projectable (z={:.6})", pc.z);
        };
        pixels.push(uv);
    }
    Ok(pixels)
}
