//! Connected-region extraction and shape filtering.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

pub type LabelImage = image::ImageBuffer<Luma<u32>, Vec<u32>>;

/// Axis-aligned bounding box of one connected region, inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl RegionBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Longer side over shorter side.
    pub fn elongation(&self) -> f64 {
        let w = self.width() as f64;
        let h = self.height() as f64;
        w.max(h) / (w.min(h) + 1e-5)
    }

    fn grow(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }
}

/// Label 8-connected foreground regions; returns the label image and the box
/// of each label (index 0 is the background and has no box).
pub fn label_regions(binary: &GrayImage) -> (LabelImage, Vec<Option<RegionBox>>) {
    let labels = connected_components(binary, Connectivity::Eight, Luma([0u8]));
    let mut boxes: Vec<Option<RegionBox>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let l = label[0] as usize;
        if l == 0 {
            continue;
        }
        if boxes.len() <= l {
            boxes.resize(l + 1, None);
        }
        if let Some(b) = boxes[l].as_mut() {
            b.grow(x, y);
        } else {
            boxes[l] = Some(RegionBox {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            });
        }
    }
    (labels, boxes)
}

/// Keep outermost regions whose box area is at least `min_area` and whose
/// elongation is at least `min_aspect`, drawn filled.
///
/// Holes are filled before labelling, so a region nested inside another is
/// judged and kept or dropped together with its enclosing region.
pub fn filter_elongated_regions(binary: &GrayImage, min_area: u64, min_aspect: f64) -> GrayImage {
    let (w, h) = binary.dimensions();
    let filled = fill_holes(binary);
    let (labels, boxes) = label_regions(&filled);
    let keep: Vec<bool> = boxes
        .iter()
        .map(|b| b.is_some_and(|b| b.area() >= min_area && b.elongation() >= min_aspect))
        .collect();

    let mut out = GrayImage::new(w, h);
    for (x, y, label) in labels.enumerate_pixels() {
        let l = label[0] as usize;
        if l != 0 && keep[l] {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    out
}

/// Fill background areas that are not 4-connected to the image border.
pub fn fill_holes(binary: &GrayImage) -> GrayImage {
    let (w, h) = binary.dimensions();
    if w == 0 || h == 0 {
        return binary.clone();
    }
    let inverted = GrayImage::from_fn(w, h, |x, y| {
        Luma([if binary.get_pixel(x, y)[0] == 0 { 255 } else { 0 }])
    });
    let labels = connected_components(&inverted, Connectivity::Four, Luma([0u8]));

    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut outside = vec![false; max_label + 1];
    for x in 0..w {
        outside[labels.get_pixel(x, 0)[0] as usize] = true;
        outside[labels.get_pixel(x, h - 1)[0] as usize] = true;
    }
    for y in 0..h {
        outside[labels.get_pixel(0, y)[0] as usize] = true;
        outside[labels.get_pixel(w - 1, y)[0] as usize] = true;
    }

    GrayImage::from_fn(w, h, |x, y| {
        let l = labels.get_pixel(x, y)[0] as usize;
        if binary.get_pixel(x, y)[0] != 0 || (l != 0 && !outside[l]) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(img: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, Luma([255]));
            }
        }
    }

    #[test]
    fn box_metrics() {
        let b = RegionBox {
            min_x: 10,
            min_y: 5,
            max_x: 13,
            max_y: 44,
        };
        assert_eq!(b.width(), 4);
        assert_eq!(b.height(), 40);
        assert_eq!(b.area(), 160);
        assert!((b.elongation() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn thin_stripes_survive_blobs_do_not() {
        let mut img = GrayImage::new(100, 100);
        rect(&mut img, 10, 10, 4, 60); // stripe: area 240, elongation 15
        rect(&mut img, 50, 50, 20, 20); // blob: elongation 1
        rect(&mut img, 80, 5, 1, 6); // tiny stripe: area 6
        let out = filter_elongated_regions(&img, 150, 5.0);
        assert_eq!(out.get_pixel(11, 30)[0], 255);
        assert_eq!(out.get_pixel(60, 60)[0], 0);
        assert_eq!(out.get_pixel(80, 7)[0], 0);
    }

    #[test]
    fn stripe_inside_rejected_ring_is_dropped_with_it() {
        let mut img = GrayImage::new(120, 120);
        // Square ring, 100x100 with a 2 px wall: elongation 1.
        rect(&mut img, 10, 10, 100, 100);
        let mut inner = GrayImage::new(120, 120);
        rect(&mut inner, 12, 12, 96, 96);
        for (x, y, p) in inner.enumerate_pixels() {
            if p[0] != 0 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        // Elongated stripe nested in the ring.
        rect(&mut img, 50, 20, 4, 70);
        let out = filter_elongated_regions(&img, 150, 5.0);
        assert!(out.pixels().all(|p| p[0] == 0));

        // The same stripe on its own is kept.
        let mut alone = GrayImage::new(120, 120);
        rect(&mut alone, 50, 20, 4, 70);
        let out = filter_elongated_regions(&alone, 150, 5.0);
        assert_eq!(out.get_pixel(51, 50)[0], 255);
    }

    #[test]
    fn kept_region_is_drawn_filled() {
        let mut img = GrayImage::new(60, 100);
        // Outline of a 10x80 bar.
        rect(&mut img, 10, 10, 10, 80);
        for y in 12..88 {
            for x in 12..18 {
                img.put_pixel(x, y, Luma([0]));
            }
        }
        let out = filter_elongated_regions(&img, 150, 5.0);
        assert_eq!(out.get_pixel(15, 50)[0], 255);
        assert_eq!(out.get_pixel(30, 50)[0], 0);
    }

    #[test]
    fn diagonal_pixels_form_one_region() {
        let mut img = GrayImage::new(10, 10);
        for i in 0..10 {
            img.put_pixel(i, i, Luma([255]));
        }
        let (_, boxes) = label_regions(&img);
        assert_eq!(boxes.iter().flatten().count(), 1);
    }

    #[test]
    fn enclosed_holes_are_filled() {
        let mut img = GrayImage::new(12, 12);
        rect(&mut img, 2, 2, 8, 8);
        img.put_pixel(5, 5, Luma([0]));
        img.put_pixel(6, 5, Luma([0]));
        let filled = fill_holes(&img);
        assert_eq!(filled.get_pixel(5, 5)[0], 255);
        assert_eq!(filled.get_pixel(0, 0)[0], 0);
    }
}
