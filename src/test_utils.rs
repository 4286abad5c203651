//! Test utilities for imageops-cutout
//!
//! Fixture builders shared by the unit tests. Only compiled for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Luma, Rgb, Rgba};
use imageproc::definitions::Image;

use crate::error::SegmentationError;
use crate::session::Segmenter;

/// Creates a 2x2 RGB image with known pixel values:
/// - (0,0): [200, 150, 100]
/// - (1,0): [100, 200, 150]
/// - (0,1): [150, 100, 200]
/// - (1,1): [50, 75, 25]
pub fn create_test_rgb_image() -> Image<Rgb<u8>> {
    let mut image: Image<Rgb<u8>> = Image::new(2, 2);
    image.put_pixel(0, 0, Rgb([200, 150, 100]));
    image.put_pixel(1, 0, Rgb([100, 200, 150]));
    image.put_pixel(0, 1, Rgb([150, 100, 200]));
    image.put_pixel(1, 1, Rgb([50, 75, 25]));
    image
}

/// Binary alpha with one opaque rectangle `(x, y, width, height)`
pub fn rect_alpha(width: u32, height: u32, rect: (u32, u32, u32, u32)) -> Image<Luma<u8>> {
    let (rx, ry, rw, rh) = rect;
    Image::from_fn(width, height, |x, y| {
        let inside = x >= rx && x < rx + rw && y >= ry && y < ry + rh;
        Luma([if inside { 255 } else { 0 }])
    })
}

/// Segmenter returning a fixed alpha regardless of its input
///
/// The returned estimate has the dimensions of the stored alpha, so a
/// mismatched input exercises the pipeline's size check.
#[derive(Debug)]
pub struct MaskSegmenter {
    alpha: Image<Luma<u8>>,
    calls: AtomicUsize,
}

impl MaskSegmenter {
    pub fn new(alpha: Image<Luma<u8>>) -> Self {
        Self {
            alpha,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Segmenter for MaskSegmenter {
    fn segment(&self, image: &Image<Rgb<u8>>) -> Result<Image<Rgba<u8>>, SegmentationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let same_size = image.dimensions() == self.alpha.dimensions();
        Ok(Image::from_fn(self.alpha.width(), self.alpha.height(), |x, y| {
            let Rgb([r, g, b]) = if same_size {
                *image.get_pixel(x, y)
            } else {
                Rgb([0, 0, 0])
            };
            Rgba([r, g, b, self.alpha.get_pixel(x, y)[0]])
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_alpha() {
        let alpha = rect_alpha(10, 10, (2, 3, 4, 5));
        assert_eq!(alpha.get_pixel(2, 3)[0], 255);
        assert_eq!(alpha.get_pixel(5, 7)[0], 255);
        assert_eq!(alpha.get_pixel(6, 7)[0], 0);
        assert_eq!(alpha.get_pixel(5, 8)[0], 0);
    }

    #[test]
    fn test_mask_segmenter_attaches_alpha() {
        let segmenter = MaskSegmenter::new(rect_alpha(2, 2, (0, 0, 1, 1)));
        let out = segmenter.segment(&create_test_rgb_image()).unwrap();

        assert_eq!(out.get_pixel(0, 0), &Rgba([200, 150, 100, 255]));
        assert_eq!(out.get_pixel(1, 1), &Rgba([50, 75, 25, 0]));
        assert_eq!(segmenter.calls(), 1);
    }
}
