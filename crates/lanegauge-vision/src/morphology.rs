//! Binary morphology with rectangular structuring elements.
//!
//! The element is `kw x kh` with its anchor at `(kw / 2, kh / 2)`. Pixels
//! outside the image do not take part in either operation.

use image::{GrayImage, Luma};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

/// Largest element side a [`Mask`] can hold.
pub const MAX_ELEMENT_SIDE: u32 = 511;

/// Full `kw x kh` rectangle anchored at its centre. Sides are clamped to
/// `1..=MAX_ELEMENT_SIDE`.
pub fn rect_element(kw: u32, kh: u32) -> Mask {
    let kw = kw.clamp(1, MAX_ELEMENT_SIDE);
    let kh = kh.clamp(1, MAX_ELEMENT_SIDE);
    let element = GrayImage::from_pixel(kw, kh, Luma([255]));
    Mask::from_image(&element, (kw / 2) as u8, (kh / 2) as u8)
}

pub fn erode_rect(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    grayscale_erode(img, &rect_element(kw, kh))
}

pub fn dilate_rect(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    grayscale_dilate(img, &rect_element(kw, kh))
}

/// Dilation followed by erosion; bridges gaps smaller than the element.
pub fn close_rect(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    erode_rect(&dilate_rect(img, kw, kh), kw, kh)
}

/// Erosion followed by dilation; removes specks smaller than the element.
pub fn open_rect(img: &GrayImage, kw: u32, kh: u32) -> GrayImage {
    dilate_rect(&erode_rect(img, kw, kh), kw, kh)
}
