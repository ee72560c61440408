use anyhow::anyhow;
use image::{DynamicImage, Rgb, RgbImage};
use lanegauge_core::{CalibrationResult, GroundHomography, ImageSize, Mat3};
use lanegauge_pipeline::{
    FixedReference, FrameSink, LaneGaugeConfig, MeasurementEngine, MeasurementSample,
    MeasurementSession, NullSink, PipelineError,
};
use lanegauge_vision::{
    BinaryMask, LaneLocalizer, LanePointMode, LocalizerConfig, PixelPoint, REFERENCE_COLOUR,
};

const W: u32 = 240;
const H: u32 = 160;
const REFERENCE: PixelPoint = PixelPoint { x: 120, y: 150 };
const CM_PER_PX: f64 = 0.5;

fn ground() -> GroundHomography {
    GroundHomography::new(Mat3::new(CM_PER_PX, 0.0, 0.0, 0.0, CM_PER_PX, 0.0, 0.0, 0.0, 1.0))
        .unwrap()
}

/// Dark road with bright horizontal markings spanning the given row ranges.
fn frame(bands: &[(u32, u32)]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(W, H, |_, y| {
        if bands.iter().any(|&(top, bottom)| (top..bottom).contains(&y)) {
            Rgb([220, 220, 220])
        } else {
            Rgb([40, 40, 40])
        }
    }))
}

fn ok(frames: Vec<DynamicImage>) -> Vec<Result<DynamicImage, String>> {
    frames.into_iter().map(Ok).collect()
}

#[derive(Default)]
struct CollectingSink {
    frames: Vec<(RgbImage, MeasurementSample)>,
}

impl FrameSink for CollectingSink {
    fn write_frame(&mut self, frame: &RgbImage, sample: &MeasurementSample) -> anyhow::Result<()> {
        self.frames.push((frame.clone(), *sample));
        Ok(())
    }
}

#[test]
fn band_mask_scenario() {
    let mask = BinaryMask::from_fn(200, 200, |_, y| (50..=60).contains(&y));
    let localizer = LaneLocalizer::new(LocalizerConfig {
        column_width: 5,
        min_lane_width: 5,
        max_jump: 30,
        lane_point_mode: LanePointMode::Centre,
    });
    let reference = PixelPoint::new(100, 150);
    let detection = localizer.locate(&mask, reference, None);
    assert_eq!(detection.point(), Some(PixelPoint::new(100, 55)));

    let engine = MeasurementEngine::new(ground(), reference, 91.7);
    let sample = engine.measure(0, &detection).unwrap();
    let expected = CM_PER_PX * 95.0 + 91.7;
    assert!((sample.distance_cm.unwrap() - expected).abs() < 1e-9);
}

#[test]
fn stream_is_measured_in_order() {
    let config = LaneGaugeConfig::default();
    let mut session = MeasurementSession::new(&config, ground(), None).unwrap();
    let frames = ok(vec![
        frame(&[(40, 60)]),
        frame(&[(40, 60)]),
        frame(&[(60, 80)]),
        frame(&[]),
        frame(&[(80, 100)]),
    ]);
    let mut sink = CollectingSink::default();
    let report = session
        .run(frames, &FixedReference(REFERENCE), &mut sink)
        .unwrap();

    assert_eq!(report.reference, REFERENCE);
    let indices: Vec<u64> = report.samples.iter().map(|s| s.frame).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
    assert!(report.samples[2].is_missing());
    assert_eq!(report.summary.valid, 3);
    assert_eq!(report.summary.missing, 1);

    // Far mode reports the band's last row, the one nearest the reference.
    for (sample, bottom) in [(&report.samples[0], 59.0), (&report.samples[1], 79.0), (&report.samples[3], 99.0)] {
        let expected = CM_PER_PX * (150.0 - bottom) + config.wheel_offset_cm;
        let got = sample.distance_cm.unwrap();
        assert!((got - expected).abs() <= 1.5, "frame {}: {got} vs {expected}", sample.frame);
    }

    assert_eq!(sink.frames.len(), 4);
    let (annotated, _) = &sink.frames[0];
    assert_eq!(*annotated.get_pixel(REFERENCE.x, REFERENCE.y), REFERENCE_COLOUR);
    // Frame counter in the bottom-left corner on every frame.
    for (annotated, _) in &sink.frames {
        let text = (130..H)
            .flat_map(|y| (0..100).map(move |x| (x, y)))
            .filter(|&(x, y)| annotated.get_pixel(x, y).0.iter().all(|&c| c > 200))
            .count();
        assert!(text > 0);
    }
}

#[test]
fn previous_detection_outweighs_stronger_band() {
    let config = LaneGaugeConfig::default();
    let far = (20, 40);
    let strong_near = (90, 113);

    let mut session = MeasurementSession::new(&config, ground(), None).unwrap();
    let frames = ok(vec![frame(&[far]), frame(&[far]), frame(&[far, strong_near])]);
    let report = session.run(frames, &FixedReference(REFERENCE), &mut NullSink).unwrap();
    let first = report.samples[0].distance_cm.unwrap();
    let second = report.samples[1].distance_cm.unwrap();
    assert!((first - second).abs() < 1e-9);

    let mut fresh = MeasurementSession::new(&config, ground(), None).unwrap();
    let frames = ok(vec![frame(&[far]), frame(&[far, strong_near])]);
    let report = fresh.run(frames, &FixedReference(REFERENCE), &mut NullSink).unwrap();
    let without_history = report.samples[0].distance_cm.unwrap();
    assert!(without_history < first - 20.0);
}

#[test]
fn decode_failure_ends_the_stream() {
    let mut session =
        MeasurementSession::new(&LaneGaugeConfig::default(), ground(), None).unwrap();
    let frames: Vec<Result<DynamicImage, String>> = vec![
        Ok(frame(&[(40, 60)])),
        Ok(frame(&[(40, 60)])),
        Err("truncated packet".into()),
        Ok(frame(&[(40, 60)])),
    ];
    let report = session.run(frames, &FixedReference(REFERENCE), &mut NullSink).unwrap();
    assert_eq!(report.samples.len(), 1);
    assert!(session.state().previous().is_some());
}

#[test]
fn unreadable_first_frame_is_fatal() {
    let mut session =
        MeasurementSession::new(&LaneGaugeConfig::default(), ground(), None).unwrap();
    let frames: Vec<Result<DynamicImage, String>> = vec![Err("bad header".into())];
    let err = session
        .run(frames, &FixedReference(REFERENCE), &mut NullSink)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::FirstFrameUnreadable(_))
    ));

    let empty: Vec<Result<DynamicImage, String>> = Vec::new();
    assert!(session
        .run(empty, &FixedReference(REFERENCE), &mut NullSink)
        .is_err());
}

#[test]
fn reference_outside_frame_is_rejected() {
    let mut session =
        MeasurementSession::new(&LaneGaugeConfig::default(), ground(), None).unwrap();
    let err = session
        .run(ok(vec![frame(&[])]), &FixedReference(PixelPoint::new(W, 10)), &mut NullSink)
        .unwrap_err();
    assert!(err.to_string().contains("outside"));
}

#[test]
fn calibration_size_must_match_frames() {
    let calibration = CalibrationResult::from_parts(
        &Mat3::new(300.0, 0.0, 159.5, 0.0, 300.0, 119.5, 0.0, 0.0, 1.0),
        [-0.1, 0.0, 0.0, 0.0, 0.0],
        0.2,
        ImageSize::new(320, 240),
        5,
    );
    let mut session =
        MeasurementSession::new(&LaneGaugeConfig::default(), ground(), Some(&calibration))
            .unwrap();
    let err = session
        .run(ok(vec![frame(&[])]), &FixedReference(REFERENCE), &mut NullSink)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Undistort(_))
    ));
}

#[test]
fn sink_errors_propagate() {
    struct FailingSink;
    impl FrameSink for FailingSink {
        fn write_frame(&mut self, _: &RgbImage, _: &MeasurementSample) -> anyhow::Result<()> {
            Err(anyhow!("encoder closed"))
        }
    }
    let mut session =
        MeasurementSession::new(&LaneGaugeConfig::default(), ground(), None).unwrap();
    let err = session
        .run(ok(vec![frame(&[]), frame(&[])]), &FixedReference(REFERENCE), &mut FailingSink)
        .unwrap_err();
    assert!(err.to_string().contains("encoder closed"));
}
