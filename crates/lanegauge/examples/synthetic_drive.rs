//! Lane distance measurement over a synthetic drive.
//!
//! This example walks the measurement workflow without any data on disk:
//! 1. Build the ground homography from a 70 x 200 cm board seen in perspective
//! 2. Render frames of a dark road with one bright marking drifting sideways
//! 3. Run the measurement session with a fixed wheel reference point
//! 4. Print the per-frame distances and the series summary, then export CSV
//!
//! Run with: `cargo run -p lanegauge --example synthetic_drive`

use anyhow::Result;
use image::{DynamicImage, Rgb, RgbImage};
use lanegauge::prelude::*;

const WIDTH: u32 = 240;
const HEIGHT: u32 = 160;
const FRAMES: u32 = 24;

/// Rows covered by the marking in frame `i`; every sixth frame has none.
fn marking_rows(i: u32) -> Option<(u32, u32)> {
    if i % 6 == 5 {
        return None;
    }
    let top = 30 + (i * 3) % 40;
    Some((top, top + 20))
}

fn render(i: u32) -> DynamicImage {
    let band = marking_rows(i);
    DynamicImage::ImageRgb8(RgbImage::from_fn(WIDTH, HEIGHT, |_, y| match band {
        Some((top, bottom)) if (top..bottom).contains(&y) => Rgb([225, 225, 225]),
        _ => Rgb([45, 45, 45]),
    }))
}

fn main() -> Result<()> {
    println!("=== Lane Distance Measurement (Synthetic Drive) ===\n");

    let board = RectangleBoard::new([
        Pt2::new(80.0, 150.0),
        Pt2::new(160.0, 150.0),
        Pt2::new(150.0, 20.0),
        Pt2::new(90.0, 20.0),
    ]);
    let homography = HomographyEstimator.estimate_from(&board)?;
    println!("Ground homography:\n{}", homography.matrix());

    let config = LaneGaugeConfig::default();
    println!(
        "Wheel offset {:.1} cm, lane point {:?}\n",
        config.wheel_offset_cm,
        config.lane_point_mode()
    );

    let frames = (0..FRAMES).map(|i| Ok::<_, std::convert::Infallible>(render(i)));
    let reference = FixedReference(PixelPoint::new(WIDTH / 2, HEIGHT - 10));
    let mut session = MeasurementSession::new(&config, homography, None)?;
    let report = session.run(frames, &reference, &mut NullSink)?;

    for sample in &report.samples {
        match sample.distance_cm {
            Some(d) => println!("  frame {:>3}: {:>7.2} cm", sample.frame, d),
            None => println!("  frame {:>3}:     n/a", sample.frame),
        }
    }
    println!("\n{}", report.summary);

    let csv = std::env::temp_dir().join("lanegauge_synthetic_drive.csv");
    write_measurement_csv(&csv, &report.samples)?;
    println!("Measurements written to {}", csv.display());

    Ok(())
}
