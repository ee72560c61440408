use crate::{LaneGaugeConfig, MeasurementEngine, MeasurementSample, PipelineError, SeriesSummary};
use anyhow::{ensure, Result};
use image::{imageops, DynamicImage, RgbImage};
use lanegauge_core::{CalibrationResult, GroundHomography, Real};
use lanegauge_vision::{
    draw_overlay, DetectionState, FrameSegmenter, LaneDetection, LaneLocalizer, PixelPoint,
    Undistorter,
};
use log::{debug, info, warn};
use std::fmt::Display;

/// Chooses the reference pixel on the first (undistorted) frame.
pub trait ReferencePointSource {
    fn select(&self, first_frame: &RgbImage) -> Result<PixelPoint>;
}

/// A reference point known in advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedReference(pub PixelPoint);

impl ReferencePointSource for FixedReference {
    fn select(&self, _first_frame: &RgbImage) -> Result<PixelPoint> {
        Ok(self.0)
    }
}

/// Receives every annotated frame, e.g. a video encoder.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage, sample: &MeasurementSample) -> Result<()>;
}

/// Discards annotated frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn write_frame(&mut self, _frame: &RgbImage, _sample: &MeasurementSample) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct MeasurementReport {
    pub reference: PixelPoint,
    pub samples: Vec<MeasurementSample>,
    pub summary: SeriesSummary,
}

/// Ordered, single-pass frame loop.
///
/// Owns the per-video [`DetectionState`]; everything else it calls is
/// stateless.
#[derive(Debug, Clone)]
pub struct MeasurementSession {
    segmenter: FrameSegmenter,
    localizer: LaneLocalizer,
    homography: GroundHomography,
    offset_cm: Real,
    undistorter: Option<Undistorter>,
    state: DetectionState,
}

impl MeasurementSession {
    /// Without a calibration, frames are measured as they come.
    pub fn new(
        config: &LaneGaugeConfig,
        homography: GroundHomography,
        calibration: Option<&CalibrationResult>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            segmenter: FrameSegmenter::new(config.segmenter_config())?,
            localizer: LaneLocalizer::new(config.localizer_config()),
            homography,
            offset_cm: config.wheel_offset_cm,
            undistorter: calibration.map(Undistorter::from_calibration),
            state: DetectionState::new(),
        })
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// Measure a whole stream.
    ///
    /// The first frame only fixes the reference point and must decode.
    /// Measured frames are numbered from the start of the stream, so the
    /// first sample has index 1. A later decode failure ends the stream.
    pub fn run<I, E, R, S>(
        &mut self,
        frames: I,
        reference_source: &R,
        sink: &mut S,
    ) -> Result<MeasurementReport>
    where
        I: IntoIterator<Item = std::result::Result<DynamicImage, E>>,
        E: Display,
        R: ReferencePointSource + ?Sized,
        S: FrameSink + ?Sized,
    {
        let mut frames = frames.into_iter();
        let first = match frames.next() {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => return Err(PipelineError::FirstFrameUnreadable(err.to_string()).into()),
            None => {
                return Err(PipelineError::FirstFrameUnreadable("stream is empty".into()).into())
            }
        };
        let first = self.undistort(first)?;
        let reference = reference_source.select(&first)?;
        ensure!(
            reference.x < first.width() && reference.y < first.height(),
            "reference point ({}, {}) lies outside the {}x{} frame",
            reference.x,
            reference.y,
            first.width(),
            first.height()
        );
        info!("reference point ({}, {})", reference.x, reference.y);

        let engine = MeasurementEngine::new(self.homography, reference, self.offset_cm);
        self.state = DetectionState::new();
        let mut samples = Vec::new();
        for (index, frame) in (1u64..).zip(frames) {
            let frame = match frame {
                Ok(frame) => frame,
                Err(err) => {
                    warn!("frame {index} could not be decoded, stopping: {err}");
                    break;
                }
            };
            let (sample, annotated) = self.process_frame(&engine, index, frame)?;
            sink.write_frame(&annotated, &sample)?;
            samples.push(sample);
        }

        let summary = SeriesSummary::from_samples(&samples);
        info!(
            "measured {} frames, {} valid ({:.1}%)",
            summary.total, summary.valid, summary.valid_percent
        );
        Ok(MeasurementReport {
            reference,
            samples,
            summary,
        })
    }

    /// Undistort, segment, localize, measure and annotate one frame.
    pub fn process_frame(
        &mut self,
        engine: &MeasurementEngine,
        index: u64,
        frame: DynamicImage,
    ) -> Result<(MeasurementSample, RgbImage), PipelineError> {
        let mut rgb = self.undistort(frame)?;
        let mask = self.segmenter.segment_gray(&imageops::grayscale(&rgb));
        let detection = self
            .localizer
            .locate(&mask, engine.reference(), self.state.previous());
        let sample = engine.measure(index, &detection)?;
        self.state.update(&detection);

        match (&detection, sample.distance_cm) {
            (LaneDetection::Detected(p), Some(d)) => {
                debug!("frame {index}: lane at ({}, {}), {d:.1} cm", p.x, p.y)
            }
            _ => debug!("frame {index}: lane not found"),
        }
        draw_overlay(
            &mut rgb,
            engine.reference(),
            detection.point(),
            &sample.overlay_label(),
        );
        Ok((sample, rgb))
    }

    fn undistort(&self, frame: DynamicImage) -> Result<RgbImage, PipelineError> {
        let rgb = frame.into_rgb8();
        match &self.undistorter {
            Some(u) => Ok(u.apply(&rgb)?),
            None => Ok(rgb),
        }
    }
}
