use crate::{PatternConfig, PipelineError};
use image::{DynamicImage, GrayImage};
use lanegauge_core::{
    BrownConrady5, CalibrationResult, ImageSize, Iso3, Mat3, PinholeCamera, PinholeIntrinsics,
    Pt2, Pt3, Real,
};
use lanegauge_linear::{
    estimate_focal_fixed_center, estimate_intrinsics_from_homographies, HomographySolver,
    PlanarPoseSolver,
};
use lanegauge_optim::planar_intrinsics::{
    refine_planar_intrinsics, IntrinsicsMask, PlanarViewObservations,
};
use lanegauge_optim::{SolveOptions, SolveReport};
use lanegauge_vision::{ChessboardDetector, PatternDetector};
use log::{debug, info, warn};
use std::path::Path;

/// Views needed before the principal point and distortion are estimated.
const MIN_VIEWS_FULL_MODEL: usize = 3;

/// How the intrinsics seed for refinement was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntrinsicsSeed {
    /// Closed form over all view homographies.
    Zhang,
    /// Focal lengths with the principal point at the image centre.
    FixedCenter,
    /// `fx = fy = max(width, height)`.
    ImageExtent,
}

/// Calibration outcome plus bookkeeping about the input set.
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    pub result: CalibrationResult,
    pub images_seen: usize,
    pub skipped_unreadable: usize,
    pub skipped_no_pattern: usize,
    pub seed: IntrinsicsSeed,
    pub solve: SolveReport,
}

/// Fits a pinhole camera with Brown-Conrady distortion from images of a
/// planar chessboard.
#[derive(Debug, Clone)]
pub struct CalibrationEngine<D = ChessboardDetector> {
    pattern: PatternConfig,
    detector: D,
    solve_opts: SolveOptions,
}

impl CalibrationEngine<ChessboardDetector> {
    pub fn new(pattern: PatternConfig) -> Result<Self, PipelineError> {
        Self::with_detector(pattern, ChessboardDetector)
    }
}

impl<D: PatternDetector> CalibrationEngine<D> {
    pub fn with_detector(pattern: PatternConfig, detector: D) -> Result<Self, PipelineError> {
        pattern.validate()?;
        Ok(Self {
            pattern,
            detector,
            solve_opts: SolveOptions::default(),
        })
    }

    pub fn with_solve_options(mut self, opts: SolveOptions) -> Self {
        self.solve_opts = opts;
        self
    }

    pub fn pattern(&self) -> &PatternConfig {
        &self.pattern
    }

    /// Calibrate from decoded grayscale images, in order.
    pub fn calibrate(&self, images: &[GrayImage]) -> Result<CalibrationReport, PipelineError> {
        let mut acc = Accumulator::default();
        for (index, img) in images.iter().enumerate() {
            self.add_image(&mut acc, index, img)?;
        }
        self.finish(acc)
    }

    /// Calibrate from decoded images of any pixel format.
    pub fn calibrate_dynamic(
        &self,
        images: &[DynamicImage],
    ) -> Result<CalibrationReport, PipelineError> {
        let mut acc = Accumulator::default();
        for (index, img) in images.iter().enumerate() {
            self.add_image(&mut acc, index, &img.to_luma8())?;
        }
        self.finish(acc)
    }

    /// Calibrate from image files. Files that cannot be decoded are skipped.
    pub fn calibrate_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Result<CalibrationReport, PipelineError> {
        let mut acc = Accumulator::default();
        for (index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            match image::open(path) {
                Ok(img) => self.add_image(&mut acc, index, &img.to_luma8())?,
                Err(err) => {
                    warn!("skipping unreadable image {}: {err}", path.display());
                    acc.seen += 1;
                    acc.unreadable += 1;
                }
            }
        }
        self.finish(acc)
    }

    fn add_image(
        &self,
        acc: &mut Accumulator,
        index: usize,
        img: &GrayImage,
    ) -> Result<(), PipelineError> {
        acc.seen += 1;
        let size = ImageSize::new(img.width(), img.height());
        match acc.size {
            None => acc.size = Some(size),
            Some(expected) if expected != size => {
                return Err(PipelineError::InconsistentImageSize {
                    index,
                    expected,
                    got: size,
                });
            }
            Some(_) => {}
        }

        let Some(corners) = self.detector.detect(img, self.pattern.size()) else {
            debug!("image {index}: pattern not found");
            acc.no_pattern += 1;
            return Ok(());
        };
        if corners.len() != self.pattern.size().corner_count() {
            warn!(
                "image {index}: detector returned {} corners, expected {}",
                corners.len(),
                self.pattern.size().corner_count()
            );
            acc.no_pattern += 1;
            return Ok(());
        }
        acc.views.push(corners);
        Ok(())
    }

    fn finish(&self, acc: Accumulator) -> Result<CalibrationReport, PipelineError> {
        let image_size = match acc.size {
            Some(size) if !acc.views.is_empty() => size,
            _ => return Err(PipelineError::NoPatternDetections { images: acc.seen }),
        };
        let objects = self.pattern.object_points();
        let (camera, poses, seed) = initial_camera(&objects, &acc.views, image_size)?;

        let views: Vec<PlanarViewObservations> = acc
            .views
            .iter()
            .map(|corners| PlanarViewObservations::new(objects.clone(), corners.clone()))
            .collect();
        let few_views = views.len() < MIN_VIEWS_FULL_MODEL;
        let mask = IntrinsicsMask {
            fix_principal_point: few_views,
            fix_distortion: few_views,
            fix_k3: false,
        };
        let estimate = refine_planar_intrinsics(views, &camera, &poses, mask, &self.solve_opts)?;

        let images_used = acc.views.len();
        info!(
            "calibration: {images_used}/{} images used, image size {image_size}, rms {:.4} px",
            acc.seen, estimate.rms
        );
        Ok(CalibrationReport {
            result: CalibrationResult {
                camera: estimate.camera,
                rms: estimate.rms,
                image_size,
                images_used,
            },
            images_seen: acc.seen,
            skipped_unreadable: acc.unreadable,
            skipped_no_pattern: acc.no_pattern,
            seed,
            solve: estimate.report,
        })
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    size: Option<ImageSize>,
    views: Vec<Vec<Pt2>>,
    seen: usize,
    unreadable: usize,
    no_pattern: usize,
}

/// Homographies, intrinsics seed and per-view poses for refinement.
fn initial_camera(
    objects: &[Pt3],
    views: &[Vec<Pt2>],
    image_size: ImageSize,
) -> Result<(PinholeCamera, Vec<Iso3>, IntrinsicsSeed), PipelineError> {
    let board: Vec<Pt2> = objects.iter().map(|p| Pt2::new(p.x, p.y)).collect();
    let homographies = views
        .iter()
        .map(|pixels| HomographySolver::estimate(&board, pixels))
        .collect::<Result<Vec<Mat3>, _>>()?;

    let (intrinsics, seed) = seed_intrinsics(&homographies, image_size);
    debug!(
        "intrinsics seed ({seed:?}): fx {:.2} fy {:.2} cx {:.2} cy {:.2}",
        intrinsics.fx, intrinsics.fy, intrinsics.cx, intrinsics.cy
    );

    let kmtx = intrinsics.k_matrix();
    let poses = homographies
        .iter()
        .enumerate()
        .map(|(view, h)| {
            PlanarPoseSolver::from_homography(&kmtx, h)
                .map_err(|source| PipelineError::Pose { view, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((
        PinholeCamera::new(intrinsics, BrownConrady5::default()),
        poses,
        seed,
    ))
}

fn seed_intrinsics(homographies: &[Mat3], image_size: ImageSize) -> (PinholeIntrinsics, IntrinsicsSeed) {
    if homographies.len() >= MIN_VIEWS_FULL_MODEL {
        match estimate_intrinsics_from_homographies(homographies) {
            Ok(k) if k.is_valid() => return (k, IntrinsicsSeed::Zhang),
            Ok(_) => debug!("zhang initialisation gave invalid intrinsics"),
            Err(err) => debug!("zhang initialisation failed: {err}"),
        }
    }
    match estimate_focal_fixed_center(homographies, image_size) {
        Ok(k) if k.is_valid() => return (k, IntrinsicsSeed::FixedCenter),
        Ok(_) => debug!("fixed-centre initialisation gave invalid intrinsics"),
        Err(err) => debug!("fixed-centre initialisation failed: {err}"),
    }

    let f = image_size.width.max(image_size.height) as Real;
    warn!("falling back to focal length {f} from the image extent");
    (
        PinholeIntrinsics {
            fx: f,
            fy: f,
            cx: (image_size.width as Real - 1.0) * 0.5,
            cy: (image_size.height as Real - 1.0) * 0.5,
            skew: 0.0,
        },
        IntrinsicsSeed::ImageExtent,
    )
}
