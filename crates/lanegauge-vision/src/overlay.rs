use crate::PixelPoint;
use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut, text_size};
use std::sync::OnceLock;

pub const REFERENCE_COLOUR: Rgb<u8> = Rgb([0, 0, 255]);
pub const LANE_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
pub const LINK_COLOUR: Rgb<u8> = Rgb([255, 255, 0]);
pub const TEXT_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_OUTLINE: Rgb<u8> = Rgb([0, 0, 0]);
const MARKER_RADIUS: i32 = 5;
const TEXT_SCALE: f32 = 18.0;
const TEXT_MARGIN: i32 = 10;

static FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

fn overlay_font() -> Option<&'static FontRef<'static>> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| match FontRef::try_from_slice(FONT_DATA) {
        Ok(font) => Some(font),
        Err(err) => {
            log::warn!("overlay font unavailable, text is skipped: {err}");
            None
        }
    })
    .as_ref()
}

/// Text printed on every annotated frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayLabel {
    pub frame: u64,
    /// Lateral distance, printed only when measured.
    pub distance_cm: Option<f64>,
}

/// Annotate a frame with the reference marker and, when a lane point was
/// found, the lane marker and the segment joining the two.
///
/// `"Frame {n}"` goes to the bottom-left corner and the distance, formatted
/// `"{:.1}cm"`, to the bottom-right.
pub fn draw_overlay(
    frame: &mut RgbImage,
    reference: PixelPoint,
    lane: Option<PixelPoint>,
    label: &OverlayLabel,
) {
    let r = (reference.x as f32, reference.y as f32);
    if let Some(lane) = lane {
        let l = (lane.x as f32, lane.y as f32);
        draw_line_segment_mut(frame, r, l, LINK_COLOUR);
        draw_filled_circle_mut(frame, (lane.x as i32, lane.y as i32), MARKER_RADIUS, LANE_COLOUR);
    }
    draw_filled_circle_mut(
        frame,
        (reference.x as i32, reference.y as i32),
        MARKER_RADIUS,
        REFERENCE_COLOUR,
    );

    let Some(font) = overlay_font() else {
        return;
    };
    let scale = PxScale::from(TEXT_SCALE);
    let bottom = frame.height() as i32 - TEXT_MARGIN;

    let frame_text = format!("Frame {}", label.frame);
    let (_, th) = text_size(scale, font, &frame_text);
    draw_outlined_text(frame, TEXT_MARGIN, bottom - th as i32, scale, font, &frame_text);

    if let Some(distance) = label.distance_cm {
        let text = format!("{distance:.1}cm");
        let (tw, th) = text_size(scale, font, &text);
        let x = (frame.width() as i32 - TEXT_MARGIN - tw as i32).max(0);
        // One line above the frame counter.
        let y = bottom - 2 * th as i32 - TEXT_MARGIN / 2;
        draw_outlined_text(frame, x, y, scale, font, &text);
    }
}

fn draw_outlined_text(
    frame: &mut RgbImage,
    x: i32,
    y: i32,
    scale: PxScale,
    font: &FontRef<'_>,
    text: &str,
) {
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx != 0 || dy != 0 {
                draw_text_mut(frame, TEXT_OUTLINE, x + dx, y + dy, scale, font, text);
            }
        }
    }
    draw_text_mut(frame, TEXT_COLOUR, x, y, scale, font, text);
}
