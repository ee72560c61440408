//! Synthetic data generators.

pub mod planar;
