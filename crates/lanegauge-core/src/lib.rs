//! Core math and geometry primitives for `lanegauge`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec2`, `Pt2`, ...),
//! - the pinhole camera model with Brown-Conrady distortion,
//! - [`GroundHomography`], the checked pixel-to-ground mapping,
//! - [`CalibrationResult`], the artifact shared by calibration and measurement.
//!
//! Camera pipeline:
//! `pixel = K ∘ distortion ∘ projection(dir)`

/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera models and distortion utilities.
pub mod models;
/// Pixel to ground-plane mapping.
pub mod homography;
/// Calibration artifact types.
pub mod calibration;
/// Deterministic synthetic data used by tests across the workspace.
pub mod synthetic;

pub use calibration::*;
pub use homography::*;
pub use math::*;
pub use models::*;
