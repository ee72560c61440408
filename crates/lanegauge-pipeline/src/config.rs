use crate::PipelineError;
use anyhow::{Context, Result};
use lanegauge_core::{synthetic::planar::grid_points, Pt3, Real};
use lanegauge_vision::{LanePointMode, LocalizerConfig, PatternSize, SegmenterConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Measurement settings, read once and handed to each component.
///
/// The JSON form is flat: localizer and segmenter keys sit next to
/// `wheel_offset_cm`. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneGaugeConfig {
    /// Added to every ground-plane distance, in centimetres.
    pub wheel_offset_cm: Real,
    #[serde(flatten)]
    pub localizer: LocalizerConfig,
    #[serde(flatten)]
    pub segmenter: SegmenterConfig,
}

impl Default for LaneGaugeConfig {
    fn default() -> Self {
        Self {
            wheel_offset_cm: 91.7,
            localizer: LocalizerConfig::default(),
            segmenter: SegmenterConfig::default(),
        }
    }
}

impl LaneGaugeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.segmenter.validate()?;
        if !self.wheel_offset_cm.is_finite() {
            return Err(PipelineError::InvalidConfig(format!(
                "wheel_offset_cm must be finite, got {}",
                self.wheel_offset_cm
            )));
        }
        if self.localizer.column_width == 0 {
            return Err(PipelineError::InvalidConfig(
                "column_width must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn lane_point_mode(&self) -> LanePointMode {
        self.localizer.lane_point_mode
    }

    pub fn segmenter_config(&self) -> SegmenterConfig {
        self.segmenter.clone()
    }

    pub fn localizer_config(&self) -> LocalizerConfig {
        self.localizer
    }
}

/// Calibration target geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Inner corners per row.
    pub cols: usize,
    /// Inner corners per column.
    pub rows: usize,
    pub square_size_mm: Real,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            cols: 9,
            rows: 6,
            square_size_mm: 25.0,
        }
    }
}

impl PatternConfig {
    pub fn size(&self) -> PatternSize {
        PatternSize::new(self.cols, self.rows)
    }

    /// Board-frame corner positions in millimetres, row-major with x fastest.
    pub fn object_points(&self) -> Vec<Pt3> {
        grid_points(self.cols, self.rows, self.square_size_mm)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.cols < 2 || self.rows < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "pattern needs at least 2x2 inner corners, got {}x{}",
                self.cols, self.rows
            )));
        }
        if !(self.square_size_mm.is_finite() && self.square_size_mm > 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "square size must be positive, got {}",
                self.square_size_mm
            )));
        }
        Ok(())
    }
}
