//! Separable Gaussian smoothing with explicit kernel sizes.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter;

/// Float grayscale image used by intermediate stages.
pub type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Fixed taps used for small kernels when sigma is derived from the size.
const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// Sigma implied by a kernel size when none is given.
pub fn sigma_for_kernel(ksize: u32) -> f64 {
    0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1D Gaussian taps. `sigma <= 0` derives it from `ksize`; odd
/// sizes up to 7 then use the binomial tables.
pub fn gaussian_kernel_1d(ksize: u32, sigma: f64) -> Vec<f32> {
    let ksize = ksize.max(1);
    if sigma <= 0.0 && ksize % 2 == 1 && ksize <= 7 {
        return SMALL_KERNELS[(ksize / 2) as usize].to_vec();
    }
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        sigma_for_kernel(ksize)
    };
    let half = (ksize as f64 - 1.0) * 0.5;
    let scale = -0.5 / (sigma * sigma);
    let taps: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - half;
            (scale * d * d).exp()
        })
        .collect();
    let sum: f64 = taps.iter().sum();
    taps.into_iter().map(|t| (t / sum) as f32).collect()
}

pub fn to_f32(img: &GrayImage) -> GrayF32 {
    let data = img.as_raw().iter().map(|&v| v as f32).collect();
    GrayF32::from_raw(img.width(), img.height(), data)
        .unwrap_or_else(|| GrayF32::new(img.width(), img.height()))
}

/// Round to nearest and saturate.
pub fn to_u8(img: &GrayF32) -> GrayImage {
    let data = img
        .as_raw()
        .iter()
        .map(|&v| v.round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(img.width(), img.height(), data)
        .unwrap_or_else(|| GrayImage::new(img.width(), img.height()))
}

/// Gaussian blur with a `(kw, kh)` kernel. Sigmas `<= 0` are derived from
/// the kernel size. Borders are replicated.
pub fn gaussian_blur(img: &GrayImage, kw: u32, kh: u32, sigma_x: f64, sigma_y: f64) -> GrayImage {
    if img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    let kx = gaussian_kernel_1d(kw, sigma_x);
    let ky = gaussian_kernel_1d(kh, sigma_y);
    // Filter in f32 so the result is rounded once instead of truncated.
    to_u8(&separable_filter(&to_f32(img), &kx, &ky))
}
