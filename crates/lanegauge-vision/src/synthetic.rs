//! Rendered test imagery.

use image::{GrayImage, Luma};
use lanegauge_core::{Mat3, Real, Vec3};

/// Render a chessboard with `cols x rows` inner corners seen through
/// `image_from_board`.
///
/// Inner corner `(c, r)` sits at board coordinates `(c * square, r * square)`,
/// so the board spans `[-square, cols * square] x [-square, rows * square]`.
/// Everything outside the board is white. Each pixel averages
/// `supersample^2` samples around its centre. Returns `None` when the
/// mapping is not invertible.
pub fn render_chessboard(
    width: u32,
    height: u32,
    image_from_board: &Mat3,
    square: Real,
    cols: usize,
    rows: usize,
    supersample: u32,
) -> Option<GrayImage> {
    let board_from_image = image_from_board.try_inverse()?;
    let s = supersample.max(1);
    let x_max = cols as Real * square;
    let y_max = rows as Real * square;

    let shade = |u: Real, v: Real| -> Real {
        let b = board_from_image * Vec3::new(u, v, 1.0);
        if b.z.abs() < Real::EPSILON {
            return 255.0;
        }
        let (bx, by) = (b.x / b.z, b.y / b.z);
        if bx < -square || by < -square || bx >= x_max || by >= y_max {
            return 255.0;
        }
        let cell = (bx / square).floor() as i64 + (by / square).floor() as i64;
        if cell.rem_euclid(2) == 0 {
            0.0
        } else {
            255.0
        }
    };

    Some(GrayImage::from_fn(width, height, |x, y| {
        let mut acc = 0.0;
        for sy in 0..s {
            for sx in 0..s {
                let u = x as Real + (sx as Real + 0.5) / s as Real - 0.5;
                let v = y as Real + (sy as Real + 0.5) / s as Real - 0.5;
                acc += shade(u, v);
            }
        }
        Luma([(acc / (s * s) as Real).round() as u8])
    }))
}
