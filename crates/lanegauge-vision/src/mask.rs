use image::{GrayImage, Luma};

const FOREGROUND: u8 = 255;

/// Per-pixel foreground/background classification of a frame.
///
/// Stored as an 8-bit image holding 0 or 255 so it can be written out or
/// handed to `imageproc` directly.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask {
    img: GrayImage,
}

impl BinaryMask {
    /// All-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            img: GrayImage::new(width, height),
        }
    }

    /// Any nonzero pixel becomes foreground.
    pub fn from_gray(mut img: GrayImage) -> Self {
        for p in img.pixels_mut() {
            if p[0] != 0 {
                p[0] = FOREGROUND;
            }
        }
        Self { img }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        Self {
            img: GrayImage::from_fn(width, height, |x, y| {
                Luma([if f(x, y) { FOREGROUND } else { 0 }])
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.img.width()
    }

    pub fn height(&self) -> u32 {
        self.img.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.img.dimensions()
    }

    /// Foreground test. Out-of-range coordinates are background.
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.img.width() && y < self.img.height() && self.img.get_pixel(x, y)[0] != 0
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.img
            .put_pixel(x, y, Luma([if value { FOREGROUND } else { 0 }]));
    }

    pub fn count(&self) -> usize {
        self.img.pixels().filter(|p| p[0] != 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.img
    }

    pub fn into_image(self) -> GrayImage {
        self.img
    }
}
