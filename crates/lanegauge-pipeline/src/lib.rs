//! Lane distance measurement pipeline.
//!
//! Two upstream steps run once:
//! - [`CalibrationEngine`] fits the camera from chessboard images,
//! - [`HomographyEstimator`] maps pixels to ground-plane centimetres from
//!   four or more correspondences.
//!
//! Then [`MeasurementSession`] walks the frames in order: undistort,
//! segment, localize the lane edge above the reference point, and convert
//! the pixel pair into a lateral distance with [`MeasurementEngine`].
//!
//! ```ignore
//! use lanegauge_pipeline::*;
//!
//! let config = LaneGaugeConfig::load_json("config.json")?;
//! let calibration = load_calibration_archive("calib/camera_intrinsics.json")?;
//! let homography = load_homography_record("homography/site.json")?;
//! let mut session = MeasurementSession::new(&config, homography, Some(&calibration))?;
//! let report = session.run(frames, &FixedReference(PixelPoint::new(640, 650)), &mut NullSink)?;
//! write_measurement_csv("out/site_measurements.csv", &report.samples)?;
//! ```

mod calibration;
mod config;
mod error;
mod homography;
mod io;
mod measurement;
mod session;

pub use calibration::*;
pub use config::*;
pub use error::*;
pub use homography::*;
pub use io::*;
pub use measurement::*;
pub use session::*;
