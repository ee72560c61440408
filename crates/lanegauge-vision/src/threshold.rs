//! Local-mean adaptive thresholding.

use image::GrayImage;
use imageproc::filter::box_filter;

/// Binary threshold against the mean of a `block_size` square neighbourhood.
///
/// A pixel becomes 255 when `pixel - mean > -ceil(c)`, 0 otherwise. The mean
/// is floored and computed with replicated borders. `block_size` is expected
/// to be odd.
pub fn adaptive_threshold_mean(img: &GrayImage, block_size: u32, c: f64) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    let radius = block_size / 2;
    let means = box_filter(img, radius, radius);
    let idelta = c.ceil() as i32;

    let data = img
        .as_raw()
        .iter()
        .zip(means.as_raw().iter())
        .map(|(&src, &mean)| {
            if src as i32 - mean as i32 > -idelta {
                255
            } else {
                0
            }
        })
        .collect();
    GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
}
