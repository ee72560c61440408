use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_with, Interpolation};
use lanegauge_core::{CalibrationResult, ImageSize, IntrinsicsModel, PinholeCamera, Pt2};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndistortError {
    #[error("frame is {got}, undistortion map was built for {expected}")]
    SizeMismatch { expected: ImageSize, got: ImageSize },
}

/// Resamples frames into an ideal pinhole image with the same camera matrix.
///
/// The source position of every output pixel is computed once. Pixels whose
/// bilinear neighbourhood leaves the frame are black.
#[derive(Debug, Clone)]
pub struct Undistorter {
    size: ImageSize,
    map: Vec<(f32, f32)>,
    identity: bool,
}

impl Undistorter {
    pub fn new(camera: &PinholeCamera, size: ImageSize) -> Self {
        let identity = camera.dist.is_zero();
        let mut map = Vec::with_capacity(size.width as usize * size.height as usize);
        if !identity {
            for y in 0..size.height {
                for x in 0..size.width {
                    let n = camera.k.pixel_to_normalized(&Pt2::new(x as f64, y as f64));
                    let src = camera.project_normalized(&n);
                    map.push((src.x as f32, src.y as f32));
                }
            }
        }
        Self {
            size,
            map,
            identity,
        }
    }

    pub fn from_calibration(calibration: &CalibrationResult) -> Self {
        Self::new(&calibration.camera, calibration.image_size)
    }

    pub fn image_size(&self) -> ImageSize {
        self.size
    }

    pub fn apply(&self, frame: &RgbImage) -> Result<RgbImage, UndistortError> {
        let got = ImageSize::new(frame.width(), frame.height());
        if got != self.size {
            return Err(UndistortError::SizeMismatch {
                expected: self.size,
                got,
            });
        }
        if self.identity {
            return Ok(frame.clone());
        }
        let w = self.size.width as usize;
        let map = &self.map;
        Ok(warp_with(
            frame,
            |x, y| {
                map.get(y as usize * w + x as usize)
                    .copied()
                    .unwrap_or((-1.0, -1.0))
            },
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
        ))
    }
}
