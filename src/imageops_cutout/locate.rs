use image::{imageops, Luma, Pixel};
use imageproc::definitions::Image;

use crate::config::LocatorConfig;

/// Inclusive pixel rectangle `(xmin, ymin)..=(xmax, ymax)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl BoundingBox {
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.xmax - self.xmin + 1
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.ymax - self.ymin + 1
    }

    #[must_use]
    pub const fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// Grows the box by `padding` on every side, clamped to a `width x height` image
    #[must_use]
    pub fn padded(&self, padding: u32, width: u32, height: u32) -> Self {
        Self {
            xmin: self.xmin.saturating_sub(padding),
            ymin: self.ymin.saturating_sub(padding),
            xmax: self.xmax.saturating_add(padding).min(width.saturating_sub(1)),
            ymax: self.ymax.saturating_add(padding).min(height.saturating_sub(1)),
        }
    }

    /// Copies the boxed region out of `image`
    #[must_use]
    pub fn crop<P: Pixel + 'static>(&self, image: &Image<P>) -> Image<P> {
        imageops::crop_imm(image, self.xmin, self.ymin, self.width(), self.height()).to_image()
    }
}

pub trait LocateObjectExt {
    /// Tight box around every pixel with non-zero alpha, or `None` for an
    /// empty mask
    fn foreground_bounds(&self) -> Option<BoundingBox>;

    /// Foreground bounds expanded by `max(padding_min, padding_fraction * min side)`
    /// and clamped to the image
    fn locate_object(&self, config: &LocatorConfig) -> Option<BoundingBox>;
}

impl LocateObjectExt for Image<Luma<u8>> {
    fn foreground_bounds(&self) -> Option<BoundingBox> {
        let (width, height) = self.dimensions();
        let mut bounds = [width, height, 0, 0];
        let mut found = false;

        for (x, y, Luma([alpha])) in self.enumerate_pixels() {
            if *alpha > 0 {
                update_bounds(&mut bounds, x, y);
                found = true;
            }
        }

        found.then(|| BoundingBox {
            xmin: bounds[0],
            ymin: bounds[1],
            xmax: bounds[2],
            ymax: bounds[3],
        })
    }

    fn locate_object(&self, config: &LocatorConfig) -> Option<BoundingBox> {
        let (width, height) = self.dimensions();
        let tight = self.foreground_bounds()?;
        let padding = config.padding_for(width, height);
        let bbox = tight.padded(padding, width, height);

        tracing::debug!(?tight, padding, ?bbox, "object located");
        Some(bbox)
    }
}

fn update_bounds(bounds: &mut [u32; 4], x: u32, y: u32) {
    bounds[0] = bounds[0].min(x);
    bounds[1] = bounds[1].min(y);
    bounds[2] = bounds[2].max(x);
    bounds[3] = bounds[3].max(y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_empty_mask_has_no_bounds() {
        let mask: Image<Luma<u8>> = Image::new(30, 30);
        assert_eq!(mask.foreground_bounds(), None);
        assert_eq!(mask.locate_object(&LocatorConfig::default()), None);
    }

    #[test]
    fn test_tight_bounds() {
        let mut mask: Image<Luma<u8>> = Image::new(50, 40);
        mask.put_pixel(10, 5, Luma([1]));
        mask.put_pixel(30, 20, Luma([255]));

        let bounds = mask.foreground_bounds().unwrap();

        assert_eq!(
            bounds,
            BoundingBox {
                xmin: 10,
                ymin: 5,
                xmax: 30,
                ymax: 20
            }
        );
        assert_eq!(bounds.width(), 21);
        assert_eq!(bounds.height(), 16);
    }

    #[test]
    fn test_padding_is_clamped_to_image() {
        let mut mask: Image<Luma<u8>> = Image::new(100, 100);
        mask.put_pixel(5, 50, Luma([255]));
        mask.put_pixel(90, 60, Luma([255]));

        let bbox = mask.locate_object(&LocatorConfig::default()).unwrap();

        assert_eq!(
            bbox,
            BoundingBox {
                xmin: 0,
                ymin: 30,
                xmax: 99,
                ymax: 80
            }
        );
    }

    #[test]
    fn test_padding_scales_with_short_side() {
        let mut mask: Image<Luma<u8>> = Image::new(2000, 1000);
        mask.put_pixel(1000, 500, Luma([255]));

        let bbox = mask.locate_object(&LocatorConfig::default()).unwrap();

        // 3% of 1000
        assert_eq!(bbox.xmin, 970);
        assert_eq!(bbox.xmax, 1030);
    }

    #[test]
    fn test_crop_copies_region() {
        let image = Image::from_fn(10, 10, |x, y| Rgba([x as u8, y as u8, 0, 255]));
        let bbox = BoundingBox {
            xmin: 2,
            ymin: 3,
            xmax: 5,
            ymax: 4,
        };

        let cropped = bbox.crop(&image);

        assert_eq!(cropped.dimensions(), (4, 2));
        assert_eq!(cropped.get_pixel(0, 0), &Rgba([2, 3, 0, 255]));
        assert_eq!(cropped.get_pixel(3, 1), &Rgba([5, 4, 0, 255]));
    }

    #[test]
    fn test_contains() {
        let bbox = BoundingBox {
            xmin: 1,
            ymin: 1,
            xmax: 3,
            ymax: 3,
        };
        assert!(bbox.contains(1, 3));
        assert!(!bbox.contains(0, 2));
        assert!(!bbox.contains(2, 4));
    }
}
