use image::Luma;
use imageproc::definitions::Image;
use imageproc::distance_transform::Norm;
use imageproc::map::{map_colors, map_colors2};
use imageproc::morphology::dilate;

use crate::config::TrimapConfig;

pub const TRIMAP_BACKGROUND: u8 = 0;
pub const TRIMAP_UNKNOWN: u8 = 128;
pub const TRIMAP_FOREGROUND: u8 = 255;

/// Three-level segmentation seeding the matting solver
///
/// Every pixel holds one of [`TRIMAP_BACKGROUND`], [`TRIMAP_UNKNOWN`] or
/// [`TRIMAP_FOREGROUND`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trimap {
    image: Image<Luma<u8>>,
}

impl Trimap {
    /// Wraps an existing three-level image, or returns `None` if any pixel
    /// holds another value
    #[must_use]
    pub fn from_image(image: Image<Luma<u8>>) -> Option<Self> {
        image
            .pixels()
            .all(|Luma([v])| matches!(*v, TRIMAP_BACKGROUND | TRIMAP_UNKNOWN | TRIMAP_FOREGROUND))
            .then_some(Self { image })
    }

    #[must_use]
    pub const fn as_image(&self) -> &Image<Luma<u8>> {
        &self.image
    }

    #[must_use]
    pub fn into_inner(self) -> Image<Luma<u8>> {
        self.image
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    #[must_use]
    pub fn unknown_count(&self) -> usize {
        self.count(TRIMAP_UNKNOWN)
    }

    #[must_use]
    pub fn foreground_count(&self) -> usize {
        self.count(TRIMAP_FOREGROUND)
    }

    #[must_use]
    pub fn background_count(&self) -> usize {
        self.count(TRIMAP_BACKGROUND)
    }

    fn count(&self, value: u8) -> usize {
        self.image.pixels().filter(|Luma([v])| *v == value).count()
    }

    /// The trimap as `0.0`, `128/255` and `1.0`
    #[must_use]
    pub fn to_unit(&self) -> Image<Luma<f32>> {
        map_colors(&self.image, |Luma([v])| Luma([f32::from(v) / 255.0]))
    }
}

pub trait BuildTrimapExt {
    /// Classifies alpha above `fg_thresh` as foreground, below `bg_thresh` as
    /// background and the rest as unknown, then widens the unknown band by a
    /// disk of radius `kernel_size` (reduced for large images).
    ///
    /// Foreground pixels touching background directly are seeded as unknown
    /// so that the band is never empty while both regions exist.
    fn build_trimap(&self, config: &TrimapConfig) -> Trimap;
}

impl BuildTrimapExt for Image<Luma<u8>> {
    fn build_trimap(&self, config: &TrimapConfig) -> Trimap {
        let (width, height) = self.dimensions();
        let fg_thresh = config.fg_thresh;
        let bg_thresh = config.bg_thresh;

        let background = map_colors(self, |Luma([a])| {
            Luma([if a < bg_thresh { u8::MAX } else { 0 }])
        });
        let near_background = dilate(&background, Norm::LInf, 1);

        let seed = map_colors2(self, &near_background, |Luma([a]), Luma([near_bg])| {
            let is_fg = a > fg_thresh;
            let is_bg = a < bg_thresh;
            let unknown = !(is_fg || is_bg) || (is_fg && near_bg > 0);
            Luma([if unknown { u8::MAX } else { 0 }])
        });

        let kernel_size = config.kernel_size_for(width, height);
        let unknown = if kernel_size > 0 {
            dilate(&seed, Norm::L2, kernel_size)
        } else {
            seed
        };

        tracing::debug!(width, height, kernel_size, "trimap built");

        let image = map_colors2(self, &unknown, |Luma([a]), Luma([u])| {
            let level = if u > 0 {
                TRIMAP_UNKNOWN
            } else if a > fg_thresh {
                TRIMAP_FOREGROUND
            } else {
                TRIMAP_BACKGROUND
            };
            Luma([level])
        });

        Trimap { image }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk_alpha(size: u32, radius: f32) -> Image<Luma<u8>> {
        let center = size as f32 / 2.0;
        Image::from_fn(size, size, |x, y| {
            let d = (x as f32 - center).hypot(y as f32 - center);
            let alpha = ((radius - d) * 64.0 + 128.0).clamp(0.0, 255.0);
            Luma([alpha as u8])
        })
    }

    #[test]
    fn test_only_three_levels() {
        let trimap = disk_alpha(64, 20.0).build_trimap(&TrimapConfig::default());
        assert!(Trimap::from_image(trimap.clone().into_inner()).is_some());
        assert!(trimap.unknown_count() > 0);
        assert!(trimap.foreground_count() > 0);
        assert!(trimap.background_count() > 0);
    }

    #[test]
    fn test_dilation_widens_band() {
        let alpha = disk_alpha(64, 20.0);
        let narrow = alpha.build_trimap(&TrimapConfig::default().with_kernel_size(0));
        let wide = alpha.build_trimap(&TrimapConfig::default().with_kernel_size(4));

        assert!(wide.unknown_count() > narrow.unknown_count());
        for (n, w) in narrow.as_image().pixels().zip(wide.as_image().pixels()) {
            if n[0] == TRIMAP_UNKNOWN {
                assert_eq!(w[0], TRIMAP_UNKNOWN);
            }
        }
    }

    #[test]
    fn test_hard_edge_gets_unknown_band() {
        let alpha = Image::from_fn(10, 10, |x, _| Luma([if x < 5 { 255 } else { 0 }]));
        let trimap = alpha.build_trimap(&TrimapConfig::default().with_kernel_size(0));

        assert_eq!(trimap.as_image().get_pixel(4, 3)[0], TRIMAP_UNKNOWN);
        assert_eq!(trimap.as_image().get_pixel(0, 3)[0], TRIMAP_FOREGROUND);
        assert_eq!(trimap.as_image().get_pixel(9, 3)[0], TRIMAP_BACKGROUND);
    }

    #[test]
    fn test_uniform_foreground_has_no_unknown() {
        let alpha = Image::from_pixel(8, 8, Luma([255u8]));
        let trimap = alpha.build_trimap(&TrimapConfig::default());
        assert_eq!(trimap.foreground_count(), 64);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let mut alpha: Image<Luma<u8>> = Image::from_pixel(3, 1, Luma([0]));
        alpha.put_pixel(0, 0, Luma([230]));
        alpha.put_pixel(1, 0, Luma([15]));
        alpha.put_pixel(2, 0, Luma([14]));

        let trimap = alpha.build_trimap(&TrimapConfig::default().with_kernel_size(0));

        assert_eq!(trimap.as_image().get_pixel(0, 0)[0], TRIMAP_UNKNOWN);
        assert_eq!(trimap.as_image().get_pixel(1, 0)[0], TRIMAP_UNKNOWN);
    }

    #[test]
    fn test_from_image_rejects_other_values() {
        let image = Image::from_pixel(2, 2, Luma([64u8]));
        assert!(Trimap::from_image(image).is_none());
    }

    #[test]
    fn test_to_unit() {
        let trimap = Trimap::from_image(Image::from_fn(3, 1, |x, _| {
            Luma([[TRIMAP_BACKGROUND, TRIMAP_UNKNOWN, TRIMAP_FOREGROUND][x as usize]])
        }))
        .unwrap();
        let unit = trimap.to_unit();
        assert_eq!(unit.get_pixel(0, 0)[0], 0.0);
        assert_eq!(unit.get_pixel(2, 0)[0], 1.0);
    }
}
