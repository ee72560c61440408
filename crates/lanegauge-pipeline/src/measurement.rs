use crate::PipelineError;
use lanegauge_core::{GroundHomography, Real};
use lanegauge_vision::{LaneDetection, OverlayLabel, PixelPoint};
use serde::{Deserialize, Serialize};

/// Distance for one frame, or `None` when the lane was not found.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSample {
    pub frame: u64,
    pub distance_cm: Option<Real>,
}

impl MeasurementSample {
    pub fn is_missing(&self) -> bool {
        self.distance_cm.is_none()
    }

    /// Text drawn on the annotated frame.
    pub fn overlay_label(&self) -> OverlayLabel {
        OverlayLabel {
            frame: self.frame,
            distance_cm: self.distance_cm,
        }
    }
}

/// Converts the reference and lane pixels into a lateral distance.
///
/// `distance = |H(reference) - H(lane)| + offset`.
#[derive(Debug, Clone)]
pub struct MeasurementEngine {
    homography: GroundHomography,
    reference: PixelPoint,
    offset_cm: Real,
}

impl MeasurementEngine {
    pub fn new(homography: GroundHomography, reference: PixelPoint, offset_cm: Real) -> Self {
        Self {
            homography,
            reference,
            offset_cm,
        }
    }

    pub fn reference(&self) -> PixelPoint {
        self.reference
    }

    pub fn homography(&self) -> &GroundHomography {
        &self.homography
    }

    /// Distance from the reference point to `lane`, offset included.
    pub fn distance_to(&self, lane: PixelPoint) -> Result<Real, PipelineError> {
        let d = self
            .homography
            .ground_distance(&self.reference.to_pt2(), &lane.to_pt2())?;
        Ok(d + self.offset_cm)
    }

    /// `NotFound` yields a missing sample, not an error.
    pub fn measure(
        &self,
        frame: u64,
        detection: &LaneDetection,
    ) -> Result<MeasurementSample, PipelineError> {
        let distance_cm = match detection {
            LaneDetection::Detected(p) => Some(self.distance_to(*p)?),
            LaneDetection::NotFound => None,
        };
        Ok(MeasurementSample { frame, distance_cm })
    }
}

/// Aggregate over a sample series. Statistics cover valid samples only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub total: usize,
    pub valid: usize,
    pub missing: usize,
    pub valid_percent: Real,
    pub missing_percent: Real,
    pub mean: Option<Real>,
    pub median: Option<Real>,
    pub min: Option<Real>,
    pub max: Option<Real>,
    /// Sample standard deviation (N - 1); `None` below two valid samples.
    pub std_dev: Option<Real>,
}

impl SeriesSummary {
    pub fn from_samples(samples: &[MeasurementSample]) -> Self {
        let mut values: Vec<Real> = samples.iter().filter_map(|s| s.distance_cm).collect();
        let valid = values.len();
        let missing = samples.len() - valid;
        let denom = samples.len().max(1) as Real;

        values.sort_by(|a, b| a.total_cmp(b));
        let mean = (valid > 0).then(|| values.iter().sum::<Real>() / valid as Real);
        let median = match valid {
            0 => None,
            n if n % 2 == 1 => Some(values[n / 2]),
            n => Some(0.5 * (values[n / 2 - 1] + values[n / 2])),
        };
        let std_dev = match mean {
            Some(m) if valid >= 2 => {
                let ss: Real = values.iter().map(|v| (v - m) * (v - m)).sum();
                Some((ss / (valid - 1) as Real).sqrt())
            }
            _ => None,
        };

        Self {
            total: samples.len(),
            valid,
            missing,
            valid_percent: 100.0 * valid as Real / denom,
            missing_percent: 100.0 * missing as Real / denom,
            mean,
            median,
            min: values.first().copied(),
            max: values.last().copied(),
            std_dev,
        }
    }
}

impl std::fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "frames with valid data: {} / {} ({:.1}%)",
            self.valid,
            self.total.max(1),
            self.valid_percent
        )?;
        write!(
            f,
            "frames missing: {} / {} ({:.1}%)",
            self.missing,
            self.total.max(1),
            self.missing_percent
        )?;
        let (Some(mean), Some(median), Some(min), Some(max)) =
            (self.mean, self.median, self.min, self.max)
        else {
            return write!(f, "\nno valid lane detections");
        };
        write!(
            f,
            "\nmean {mean:.2} cm, median {median:.2} cm, min {min:.2} cm, max {max:.2} cm"
        )?;
        match self.std_dev {
            Some(sd) => write!(f, ", sd {sd:.2} cm"),
            None => write!(f, ", sd n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanegauge_core::{Mat3, MappingError};

    fn sample(frame: u64, d: Option<Real>) -> MeasurementSample {
        MeasurementSample {
            frame,
            distance_cm: d,
        }
    }

    #[test]
    fn three_four_five() {
        let h = GroundHomography::new(Mat3::identity()).unwrap();
        let engine = MeasurementEngine::new(h, PixelPoint::new(0, 0), 0.0);
        assert_eq!(engine.distance_to(PixelPoint::new(3, 4)).unwrap(), 5.0);

        let with_offset = MeasurementEngine::new(h, PixelPoint::new(0, 0), 91.7);
        let s = with_offset
            .measure(7, &LaneDetection::Detected(PixelPoint::new(30, 40)))
            .unwrap();
        assert_eq!(s.frame, 7);
        assert!((s.distance_cm.unwrap() - 141.7).abs() < 1e-12);
    }

    #[test]
    fn not_found_is_missing_sample() {
        let engine = MeasurementEngine::new(
            GroundHomography::new(Mat3::identity()).unwrap(),
            PixelPoint::new(5, 5),
            10.0,
        );
        let s = engine.measure(3, &LaneDetection::NotFound).unwrap();
        assert!(s.is_missing());
        assert_eq!(
            s.overlay_label(),
            OverlayLabel {
                frame: 3,
                distance_cm: None
            }
        );
    }

    #[test]
    fn zero_weight_is_fatal() {
        // Third row [1, 0, -1] vanishes at x = 1.
        let h = GroundHomography::new(Mat3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, -1.0))
            .unwrap();
        let engine = MeasurementEngine::new(h, PixelPoint::new(1, 9), 0.0);
        let err = engine
            .measure(0, &LaneDetection::Detected(PixelPoint::new(3, 2)))
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Mapping(MappingError::ZeroWeight { .. })
        ));
    }

    #[test]
    fn summary_over_valid_samples() {
        let samples = vec![
            sample(1, Some(100.0)),
            sample(2, None),
            sample(3, Some(104.0)),
            sample(4, Some(102.0)),
            sample(5, None),
        ];
        let s = SeriesSummary::from_samples(&samples);
        assert_eq!((s.total, s.valid, s.missing), (5, 3, 2));
        assert!((s.valid_percent - 60.0).abs() < 1e-12);
        assert!((s.missing_percent - 40.0).abs() < 1e-12);
        assert_eq!(s.mean, Some(102.0));
        assert_eq!(s.median, Some(102.0));
        assert_eq!(s.min, Some(100.0));
        assert_eq!(s.max, Some(104.0));
        assert!((s.std_dev.unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn summary_edge_cases() {
        let empty = SeriesSummary::from_samples(&[]);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.valid_percent, 0.0);
        assert_eq!(empty.mean, None);

        let one = SeriesSummary::from_samples(&[sample(0, Some(50.0))]);
        assert_eq!(one.median, Some(50.0));
        assert_eq!(one.std_dev, None);

        let even = SeriesSummary::from_samples(&[sample(0, Some(1.0)), sample(1, Some(4.0))]);
        assert_eq!(even.median, Some(2.5));

        let all_missing = SeriesSummary::from_samples(&[sample(0, None), sample(1, None)]);
        assert_eq!(all_missing.missing_percent, 100.0);
        assert!(all_missing.to_string().contains("no valid lane detections"));
    }
}
