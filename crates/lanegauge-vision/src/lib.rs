//! Raster processing for `lanegauge`.
//!
//! Per-frame path: [`FrameSegmenter`] turns an undistorted frame into a
//! [`BinaryMask`], then [`LaneLocalizer`] scans a narrow column above the
//! reference point for the lane edge.
//!
//! Calibration path: [`ChessboardDetector`] (behind [`PatternDetector`])
//! finds the inner corners at sub-pixel accuracy. [`Undistorter`] resamples
//! frames through the calibrated lens model.

pub mod filter;
pub mod morphology;
pub mod regions;
pub mod synthetic;
pub mod threshold;

mod chessboard;
mod localize;
mod mask;
mod overlay;
mod segment;
mod undistort;

pub use chessboard::*;
pub use localize::*;
pub use mask::*;
pub use overlay::*;
pub use segment::*;
pub use undistort::*;
