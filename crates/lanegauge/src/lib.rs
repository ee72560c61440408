//! High-level entry crate for `lanegauge`.
//!
//! A camera mounted on a vehicle looks at the road surface. Given the lens
//! calibration and a pixel-to-ground homography, every frame yields one
//! lateral distance between a fixed reference pixel (the wheel) and the
//! nearest painted lane edge above it.
//!
//! ```no_run
//! use lanegauge::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = LaneGaugeConfig::load_json("config.json")?;
//! let calibration = load_calibration_archive("calib/camera_intrinsics.json")?;
//! let homography = load_homography_record("homography/site.json")?;
//!
//! let frames = (0..300).map(|i| image::open(format!("frames/{i:05}.png")));
//!
//! let mut session = MeasurementSession::new(&config, homography, Some(&calibration))?;
//! let report = session.run(frames, &FixedReference(PixelPoint::new(640, 650)), &mut NullSink)?;
//! write_measurement_csv("out/measurements.csv", &report.samples)?;
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - **[`core`]**: math aliases, camera model, calibration artifact, ground homography
//! - **[`linear`]**: closed-form homography, intrinsics and pose initialisation
//! - **[`optim`]**: Levenberg-Marquardt refinement of planar intrinsics
//! - **[`vision`]**: segmentation, lane localisation, chessboard detection, undistortion
//! - **[`pipeline`]**: calibration engine, homography estimation, measurement session, file formats
//! - **[`prelude`]**: convenient re-exports for common use cases
//!
//! ## Stability
//!
//! The `lanegauge` crate is the public compatibility boundary. Lower-level
//! crates are intended for advanced usage and may evolve more quickly.

/// Core math types, camera model and ground-plane mapping.
pub mod core {
    pub use lanegauge_core::*;
}

/// Closed-form solvers.
pub mod linear {
    pub use lanegauge_linear::*;
}

/// Non-linear least-squares refinement.
pub mod optim {
    pub use lanegauge_optim::*;
}

/// Per-frame raster processing and calibration target detection.
pub mod vision {
    pub use lanegauge_vision::*;
}

/// End-to-end calibration and measurement workflows.
pub mod pipeline {
    pub use lanegauge_pipeline::*;
}

/// Prelude module for convenient imports.
///
/// Import with `use lanegauge::prelude::*;` to get started quickly.
pub mod prelude {
    // Common types
    pub use crate::core::{CalibrationResult, GroundHomography, ImageSize, Mat3, Pt2, Real};

    // Per-frame processing
    pub use crate::vision::{
        BinaryMask, DetectionState, FrameSegmenter, LaneDetection, LaneLocalizer, LanePointMode,
        PixelPoint,
    };

    // Workflows
    pub use crate::pipeline::{
        CalibrationEngine, FixedReference, FrameSink, HomographyEstimator, LaneGaugeConfig,
        MeasurementEngine, MeasurementReport, MeasurementSample, MeasurementSession, NullSink,
        PatternConfig, PointPair, RectangleBoard, ReferencePointSource, SeriesSummary,
    };

    // Files
    pub use crate::pipeline::{
        find_calibration_images, load_calibration_archive, load_homography_record,
        save_homography_record, write_measurement_csv, CalibrationArchive,
    };
}
