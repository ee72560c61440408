use crate::filter::gaussian_blur;
use crate::morphology::{close_rect, open_rect, MAX_ELEMENT_SIDE};
use crate::regions::filter_elongated_regions;
use crate::threshold::adaptive_threshold_mean;
use crate::BinaryMask;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SegmentError {
    #[error("gaussian kernel must have odd positive sides, got {0}x{1}")]
    InvalidGaussianKernel(u32, u32),
    #[error("adaptive threshold block size must be odd and >= 3, got {0}")]
    InvalidBlockSize(u32),
    #[error("morphological kernel sides must be in 1..=511, got {0}x{1}")]
    InvalidMorphKernel(u32, u32),
    #[error("minimum aspect ratio must be finite and non-negative, got {0}")]
    InvalidAspectRatio(f64),
    #[error("threshold bias must be finite, got {0}")]
    InvalidBias(f64),
}

/// Parameters of the segmentation pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Gaussian kernel `(width, height)`, both odd.
    pub gaussian_kernel: (u32, u32),
    /// Side of the adaptive-threshold neighbourhood (odd, >= 3).
    pub block_size: u32,
    /// Bias subtracted from the local mean.
    pub c_const: f64,
    /// Minimum bounding-box area of a kept region, in pixels.
    pub min_contour_area: u64,
    /// Minimum longer/shorter side ratio of a kept region.
    pub min_aspect_ratio: f64,
    /// Rectangular element `(width, height)` for closing and opening.
    pub morph_kernel: (u32, u32),
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            gaussian_kernel: (15, 15),
            block_size: 25,
            c_const: -8.0,
            min_contour_area: 150,
            min_aspect_ratio: 5.0,
            morph_kernel: (10, 15),
        }
    }
}

impl SegmenterConfig {
    pub fn validate(&self) -> Result<(), SegmentError> {
        let (gw, gh) = self.gaussian_kernel;
        if gw == 0 || gh == 0 || gw % 2 == 0 || gh % 2 == 0 {
            return Err(SegmentError::InvalidGaussianKernel(gw, gh));
        }
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(SegmentError::InvalidBlockSize(self.block_size));
        }
        let (mw, mh) = self.morph_kernel;
        if !(1..=MAX_ELEMENT_SIDE).contains(&mw) || !(1..=MAX_ELEMENT_SIDE).contains(&mh) {
            return Err(SegmentError::InvalidMorphKernel(mw, mh));
        }
        if !self.min_aspect_ratio.is_finite() || self.min_aspect_ratio < 0.0 {
            return Err(SegmentError::InvalidAspectRatio(self.min_aspect_ratio));
        }
        if !self.c_const.is_finite() {
            return Err(SegmentError::InvalidBias(self.c_const));
        }
        Ok(())
    }
}

/// Every intermediate raster of one segmentation run.
#[derive(Debug, Clone)]
pub struct SegmentStages {
    pub gray: GrayImage,
    pub blurred: GrayImage,
    pub thresholded: GrayImage,
    pub filtered: GrayImage,
    pub mask: BinaryMask,
}

/// Converts one undistorted frame into a mask of lane-marking-like regions.
///
/// Stateless: the same frame and configuration always give the same mask.
#[derive(Debug, Clone)]
pub struct FrameSegmenter {
    config: SegmenterConfig,
}

impl FrameSegmenter {
    pub fn new(config: SegmenterConfig) -> Result<Self, SegmentError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn segment(&self, frame: &DynamicImage) -> BinaryMask {
        self.segment_gray(&frame.to_luma8())
    }

    pub fn segment_gray(&self, gray: &GrayImage) -> BinaryMask {
        self.stages(gray).mask
    }

    pub fn stages(&self, gray: &GrayImage) -> SegmentStages {
        let cfg = &self.config;
        let (gw, gh) = cfg.gaussian_kernel;
        let blurred = gaussian_blur(gray, gw, gh, 0.0, 0.0);
        let thresholded = adaptive_threshold_mean(&blurred, cfg.block_size, cfg.c_const);
        let filtered =
            filter_elongated_regions(&thresholded, cfg.min_contour_area, cfg.min_aspect_ratio);
        let (mw, mh) = cfg.morph_kernel;
        let cleaned = open_rect(&close_rect(&filtered, mw, mh), mw, mh);

        SegmentStages {
            gray: gray.clone(),
            blurred,
            thresholded,
            filtered,
            mask: BinaryMask::from_gray(cleaned),
        }
    }
}
