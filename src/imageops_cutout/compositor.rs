use image::{imageops, DynamicImage, Rgba};
use imageproc::definitions::{Clamp, Image};
use imageproc::map::map_colors;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Background of the output canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fill {
    /// Opaque white, output is RGB
    #[default]
    White,
    /// Fully transparent, output is RGBA
    Transparent,
}

impl Fill {
    #[must_use]
    pub const fn pixel(self) -> Rgba<u8> {
        match self {
            Self::White => Rgba([255, 255, 255, 255]),
            Self::Transparent => Rgba([255, 255, 255, 0]),
        }
    }
}

/// Size and fill of the output image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasSpec {
    width: u32,
    height: u32,
    fill: Fill,
}

impl CanvasSpec {
    /// # Errors
    ///
    /// * `Error::InvalidCanvas` - When either dimension is zero
    pub fn new(width: u32, height: u32, fill: Fill) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidCanvas { width, height });
        }
        Ok(Self {
            width,
            height,
            fill,
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub const fn fill(&self) -> Fill {
        self.fill
    }

    /// Canvas of the fill colour with nothing placed on it
    #[must_use]
    pub fn blank(&self) -> DynamicImage {
        self.finish(self.canvas())
    }

    fn canvas(&self) -> Image<Rgba<u8>> {
        Image::from_pixel(self.width, self.height, self.fill.pixel())
    }

    /// RGB for an opaque fill, RGBA for a transparent one
    fn finish(&self, canvas: Image<Rgba<u8>>) -> DynamicImage {
        match self.fill {
            Fill::White => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).into_rgb8()),
            Fill::Transparent => DynamicImage::ImageRgba8(canvas),
        }
    }
}

/// Largest size with the aspect ratio of `size` that fits `target`, or
/// `size` itself when it already fits
#[must_use]
pub fn fit_within(size: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (width, height) = size;
    let (target_width, target_height) = target;
    if width <= target_width && height <= target_height {
        return size;
    }

    let scale = (f64::from(target_width) / f64::from(width))
        .min(f64::from(target_height) / f64::from(height));
    let scaled = |len: u32, max: u32| ((f64::from(len) * scale).round() as u32).clamp(1, max);
    (scaled(width, target_width), scaled(height, target_height))
}

/// Offset that centers `size` inside `target`, rounding towards the top-left
#[must_use]
pub const fn center_offset(size: (u32, u32), target: (u32, u32)) -> (i64, i64) {
    (
        (target.0.saturating_sub(size.0) / 2) as i64,
        (target.1.saturating_sub(size.1) / 2) as i64,
    )
}

/// Placement of a cut-out subject on a fixed-size canvas
pub trait CompositeExt {
    /// Downscales the subject to fit the canvas if needed, never upscaling,
    /// and alpha-blends it centered onto the fill colour.
    ///
    /// The result always has exactly the canvas dimensions.
    fn composite_onto(&self, canvas: &CanvasSpec) -> DynamicImage;
}

impl CompositeExt for Image<Rgba<u8>> {
    fn composite_onto(&self, spec: &CanvasSpec) -> DynamicImage {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return spec.blank();
        }

        let (scaled_width, scaled_height) = fit_within((width, height), spec.dimensions());
        let subject = if (scaled_width, scaled_height) == (width, height) {
            None
        } else {
            Some(resize_premultiplied(self, scaled_width, scaled_height))
        };
        let subject = subject.as_ref().unwrap_or(self);

        let (x, y) = center_offset(subject.dimensions(), spec.dimensions());
        tracing::debug!(
            source_width = width,
            source_height = height,
            scaled_width,
            scaled_height,
            x,
            y,
            "compositing subject"
        );

        let mut canvas = spec.canvas();
        imageops::overlay(&mut canvas, subject, x, y);
        spec.finish(canvas)
    }
}

/// Lanczos3 resize in premultiplied space so that the colour of fully
/// transparent pixels cannot bleed into the edge
fn resize_premultiplied(image: &Image<Rgba<u8>>, width: u32, height: u32) -> Image<Rgba<u8>> {
    let premultiplied: Image<Rgba<f32>> = map_colors(image, |Rgba([r, g, b, a])| {
        let alpha = f32::from(a) / 255.0;
        Rgba([
            f32::from(r) / 255.0 * alpha,
            f32::from(g) / 255.0 * alpha,
            f32::from(b) / 255.0 * alpha,
            alpha,
        ])
    });

    let resized = imageops::resize(&premultiplied, width, height, imageops::FilterType::Lanczos3);

    map_colors(&resized, |Rgba([r, g, b, a])| {
        let alpha = a.clamp(0.0, 1.0);
        let unpremultiply = |c: f32| {
            if alpha > 0.0 {
                <u8 as Clamp<f32>>::clamp((c / alpha * 255.0).round())
            } else {
                0
            }
        };
        Rgba([
            unpremultiply(r),
            unpremultiply(g),
            unpremultiply(b),
            <u8 as Clamp<f32>>::clamp((alpha * 255.0).round()),
        ])
    })
}
