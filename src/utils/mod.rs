//! Internal utility functions for imageops-cutout.
//!
//! This module contains common functionality used across different image operations.

use image::{Luma, Rgb};
use imageproc::definitions::{Clamp, Image};
use imageproc::map::map_colors;

/// Converts an 8-bit RGB image to floating point channels in `[0, 1]`
#[must_use]
pub fn to_unit_rgb(image: &Image<Rgb<u8>>) -> Image<Rgb<f32>> {
    map_colors(image, |Rgb([r, g, b])| {
        Rgb([
            normalize_u8(r),
            normalize_u8(g),
            normalize_u8(b),
        ])
    })
}

/// Quantizes a `[0, 1]` mask to 8 bits, rounding to nearest
#[must_use]
pub fn quantize_unit(mask: &Image<Luma<f32>>) -> Image<Luma<u8>> {
    map_colors(mask, |Luma([v])| Luma([<u8 as Clamp<f32>>::clamp((v * 255.0).round())]))
}

#[inline]
fn normalize_u8(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Validates that two images have matching dimensions, returning both
/// dimension pairs on mismatch
pub fn validate_matching_dimensions(
    expected: (u32, u32),
    actual: (u32, u32),
) -> Result<(), ((u32, u32), (u32, u32))> {
    if expected == actual {
        Ok(())
    } else {
        Err((expected, actual))
    }
}
