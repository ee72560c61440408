use lanegauge_core::{ImageSize, MappingError};
use lanegauge_linear::{HomographyError, IntrinsicsInitError, PoseError};
use lanegauge_optim::planar_intrinsics::RefineError;
use lanegauge_vision::{SegmentError, UndistortError};
use thiserror::Error;

/// Terminating conditions of the pipeline.
///
/// A frame without a visible lane is not an error; it is recorded as a
/// missing sample.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Segment(#[from] SegmentError),
    #[error("no valid pattern detections in {images} images")]
    NoPatternDetections { images: usize },
    #[error("image {index} is {got}, expected {expected}")]
    InconsistentImageSize {
        index: usize,
        expected: ImageSize,
        got: ImageSize,
    },
    #[error("homography estimation failed: {0}")]
    Homography(#[from] HomographyError),
    #[error("homography must be 3x3, got {rows}x{cols}")]
    HomographyShape { rows: usize, cols: usize },
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("intrinsics initialisation failed: {0}")]
    IntrinsicsInit(#[from] IntrinsicsInitError),
    #[error("pose recovery failed for view {view}: {source}")]
    Pose { view: usize, source: PoseError },
    #[error("calibration refinement failed: {0}")]
    Refine(#[from] RefineError),
    #[error(transparent)]
    Undistort(#[from] UndistortError),
    #[error("first frame is unreadable: {0}")]
    FirstFrameUnreadable(String),
}
