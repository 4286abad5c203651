use image::Luma;
use imageproc::definitions::Image;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::{grayscale_close, grayscale_open, Mask};

use crate::config::DenoiseConfig;
use crate::error::DenoiseError;

/// Morphological cleanup of a segmentation alpha channel
pub trait DenoiseAlphaExt {
    /// Closes small holes, opens away isolated speckles, then softens the
    /// result with a light Gaussian blur.
    ///
    /// The output has the dimensions of the input and every value stays in
    /// `[0, 255]`.
    ///
    /// # Errors
    ///
    /// * `DenoiseError::InvalidParameter` - When `blur_sigma` is not positive
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use image::{ImageBuffer, Luma};
    /// use imageops_cutout::{DenoiseAlphaExt, DenoiseConfig, Image};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let alpha: Image<Luma<u8>> = ImageBuffer::new(64, 64);
    /// let cleaned = alpha.denoise_alpha(&DenoiseConfig::default())?;
    /// assert_eq!(cleaned.dimensions(), (64, 64));
    /// # Ok(())
    /// # }
    /// ```
    fn denoise_alpha(&self, config: &DenoiseConfig) -> Result<Self, DenoiseError>
    where
        Self: Sized;
}

impl DenoiseAlphaExt for Image<Luma<u8>> {
    fn denoise_alpha(&self, config: &DenoiseConfig) -> Result<Self, DenoiseError> {
        config.validate()?;

        if self.width() == 0 || self.height() == 0 {
            return Ok(self.clone());
        }

        let closed = grayscale_close(self, &Mask::square(config.close_radius));
        let opened = grayscale_open(&closed, &Mask::square(config.open_radius));

        // gaussian_blur_f32 clamps back into the u8 range
        Ok(gaussian_blur_f32(&opened, config.blur_sigma))
    }
}
