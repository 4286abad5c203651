use image::{Luma, Rgb, Rgba};
use imageproc::{definitions::Image, map::map_colors2};

use crate::{error::Error, utils::validate_matching_dimensions};

/// Attaches a refined alpha mask to the source photograph
pub trait ApplyAlphaMaskExt {
    /// Builds an RGBA image from the colour channels of `self` and `mask` as alpha
    ///
    /// # Errors
    ///
    /// * `Error::DimensionMismatch` - When image and mask dimensions don't match
    fn apply_alpha_mask(&self, mask: &Image<Luma<u8>>) -> Result<Image<Rgba<u8>>, Error>;
}

impl ApplyAlphaMaskExt for Image<Rgb<u8>> {
    fn apply_alpha_mask(&self, mask: &Image<Luma<u8>>) -> Result<Image<Rgba<u8>>, Error> {
        validate_matching_dimensions(self.dimensions(), mask.dimensions())
            .map_err(|(expected, actual)| Error::DimensionMismatch { expected, actual })?;

        Ok(map_colors2(self, mask, |Rgb([red, green, blue]), Luma([alpha])| {
            Rgba([red, green, blue, alpha])
        }))
    }
}

/// Splits the alpha channel out of an RGBA image
pub trait ExtractAlphaExt {
    fn extract_alpha(&self) -> Image<Luma<u8>>;
}

impl ExtractAlphaExt for Image<Rgba<u8>> {
    fn extract_alpha(&self) -> Image<Luma<u8>> {
        imageproc::map::map_colors(self, |Rgba([_, _, _, alpha])| Luma([alpha]))
    }
}
