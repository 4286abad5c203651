//! Tunable thresholds for every refinement stage.
//!
//! Each default is a named constant so that a run can be reproduced from its
//! configuration alone. The values are tuned for product photos on plain
//! backgrounds; none of them is known to be optimal.

use serde::{Deserialize, Serialize};

use crate::error::{ComponentFilterError, DenoiseError, Error};

/// Square closing radius (5x5 structuring element)
pub const DEFAULT_CLOSE_RADIUS: u8 = 2;
/// Square opening radius (3x3 structuring element)
pub const DEFAULT_OPEN_RADIUS: u8 = 1;
pub const DEFAULT_BLUR_SIGMA: f32 = 1.5;

pub const DEFAULT_COMPONENT_CUTOFF: u8 = 15;
pub const DEFAULT_TOP_REGION_FRACTION: f32 = 0.22;
pub const DEFAULT_TOP_MIN_AREA_FLOOR: u32 = 64;
pub const DEFAULT_TOP_MIN_AREA_FRACTION: f32 = 0.05;

pub const DEFAULT_REFINEMENT_CUTOFF: u8 = 0;
pub const DEFAULT_REFINEMENT_MIN_AREA_FLOOR: u32 = 32;
pub const DEFAULT_REFINEMENT_MIN_AREA_FRACTION: f32 = 0.0005;

pub const DEFAULT_FG_THRESH: u8 = 230;
pub const DEFAULT_BG_THRESH: u8 = 15;
pub const DEFAULT_TRIMAP_KERNEL_SIZE: u8 = 8;
pub const REDUCED_TRIMAP_KERNEL_SIZE: u8 = 5;
/// Above this many pixels the trimap dilation falls back to the reduced radius
pub const LARGE_IMAGE_PIXELS: u64 = 4_000_000;

pub const DEFAULT_MATTING_EPSILON: f64 = 1e-7;
pub const DEFAULT_MATTING_WINDOW_RADIUS: u32 = 1;
pub const DEFAULT_MATTING_LAMBDA: f64 = 100.0;
pub const DEFAULT_MATTING_MAX_ITERATIONS: usize = 1000;
pub const DEFAULT_MATTING_TOLERANCE: f64 = 1e-5;
pub const DEFAULT_MATTING_MAX_PIXELS: u64 = 12_000_000;

pub const DEFAULT_PADDING_MIN: u32 = 20;
pub const DEFAULT_PADDING_FRACTION: f32 = 0.03;

/// Morphological cleanup of the raw alpha channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    /// Closing radius in pixels, fills small holes
    pub close_radius: u8,
    /// Opening radius in pixels, removes isolated speckles
    pub open_radius: u8,
    /// Standard deviation of the final Gaussian smoothing
    pub blur_sigma: f32,
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            close_radius: DEFAULT_CLOSE_RADIUS,
            open_radius: DEFAULT_OPEN_RADIUS,
            blur_sigma: DEFAULT_BLUR_SIGMA,
        }
    }
}

impl DenoiseConfig {
    pub fn validate(&self) -> Result<(), DenoiseError> {
        if !(self.blur_sigma.is_finite() && self.blur_sigma > 0.0) {
            return Err(DenoiseError::InvalidParameter(format!(
                "blur_sigma must be positive, got {}",
                self.blur_sigma
            )));
        }
        Ok(())
    }
}

/// Where a small component has to sit before it is considered noise
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionOfInterest {
    /// The whole frame
    Whole,
    /// The top `fraction` of the image height
    Top { fraction: f32 },
}

impl RegionOfInterest {
    /// Whether a centroid row lies inside the region for an image of `height` rows
    #[must_use]
    pub fn contains_row(&self, centroid_y: f32, height: u32) -> bool {
        match *self {
            Self::Whole => true,
            Self::Top { fraction } => centroid_y < height as f32 * fraction,
        }
    }
}

/// Connected-component noise filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentFilterConfig {
    /// Pixels with alpha strictly above this value are foreground
    pub cutoff: u8,
    pub region: RegionOfInterest,
    /// Lower bound on the minimum component area
    pub min_area_floor: u32,
    /// Minimum component area as a fraction of the image area
    pub min_area_fraction: f32,
    /// Drop every component except the largest one
    pub keep_largest_only: bool,
}

impl Default for ComponentFilterConfig {
    fn default() -> Self {
        Self::watermark_pass()
    }
}

impl ComponentFilterConfig {
    /// Strips text and watermark fragments from the top of the frame
    #[must_use]
    pub const fn watermark_pass() -> Self {
        Self {
            cutoff: DEFAULT_COMPONENT_CUTOFF,
            region: RegionOfInterest::Top {
                fraction: DEFAULT_TOP_REGION_FRACTION,
            },
            min_area_floor: DEFAULT_TOP_MIN_AREA_FLOOR,
            min_area_fraction: DEFAULT_TOP_MIN_AREA_FRACTION,
            keep_largest_only: false,
        }
    }

    /// Whole-image pass run on the matted alpha before the bounding box is taken
    #[must_use]
    pub const fn refinement_pass() -> Self {
        Self {
            cutoff: DEFAULT_REFINEMENT_CUTOFF,
            region: RegionOfInterest::Whole,
            min_area_floor: DEFAULT_REFINEMENT_MIN_AREA_FLOOR,
            min_area_fraction: DEFAULT_REFINEMENT_MIN_AREA_FRACTION,
            keep_largest_only: false,
        }
    }

    #[must_use]
    pub const fn with_cutoff(mut self, cutoff: u8) -> Self {
        self.cutoff = cutoff;
        self
    }

    #[must_use]
    pub const fn with_region(mut self, region: RegionOfInterest) -> Self {
        self.region = region;
        self
    }

    #[must_use]
    pub const fn with_min_area(mut self, floor: u32, fraction: f32) -> Self {
        self.min_area_floor = floor;
        self.min_area_fraction = fraction;
        self
    }

    #[must_use]
    pub const fn with_keep_largest_only(mut self, keep_largest_only: bool) -> Self {
        self.keep_largest_only = keep_largest_only;
        self
    }

    /// `max(min_area_floor, width * height * min_area_fraction)`
    #[must_use]
    pub fn min_area(&self, width: u32, height: u32) -> u64 {
        let area = u64::from(width) * u64::from(height);
        let scaled = (area as f64 * f64::from(self.min_area_fraction)) as u64;
        scaled.max(u64::from(self.min_area_floor))
    }

    pub fn validate(&self) -> Result<(), ComponentFilterError> {
        if let RegionOfInterest::Top { fraction } = self.region {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(ComponentFilterError::InvalidParameter(format!(
                    "top region fraction must be in (0, 1], got {fraction}"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.min_area_fraction) {
            return Err(ComponentFilterError::InvalidParameter(format!(
                "min_area_fraction must be in [0, 1), got {}",
                self.min_area_fraction
            )));
        }
        Ok(())
    }
}

/// Three-level trimap construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimapConfig {
    /// Alpha strictly above this is definite foreground
    pub fg_thresh: u8,
    /// Alpha strictly below this is definite background
    pub bg_thresh: u8,
    /// Disk radius used to widen the unknown band
    pub kernel_size: u8,
    /// Radius used instead of `kernel_size` for large images
    pub reduced_kernel_size: u8,
    pub large_image_pixels: u64,
}

impl Default for TrimapConfig {
    fn default() -> Self {
        Self {
            fg_thresh: DEFAULT_FG_THRESH,
            bg_thresh: DEFAULT_BG_THRESH,
            kernel_size: DEFAULT_TRIMAP_KERNEL_SIZE,
            reduced_kernel_size: REDUCED_TRIMAP_KERNEL_SIZE,
            large_image_pixels: LARGE_IMAGE_PIXELS,
        }
    }
}

impl TrimapConfig {
    #[must_use]
    pub const fn with_thresholds(mut self, fg_thresh: u8, bg_thresh: u8) -> Self {
        self.fg_thresh = fg_thresh;
        self.bg_thresh = bg_thresh;
        self
    }

    #[must_use]
    pub const fn with_kernel_size(mut self, kernel_size: u8) -> Self {
        self.kernel_size = kernel_size;
        self
    }

    /// Dilation radius for an image of the given size
    #[must_use]
    pub fn kernel_size_for(&self, width: u32, height: u32) -> u8 {
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.large_image_pixels {
            self.kernel_size.min(self.reduced_kernel_size)
        } else {
            self.kernel_size
        }
    }
}

/// Closed-form matting over the unknown band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MattingConfig {
    /// Set to `false` to skip matting and keep the cleaned alpha
    pub enabled: bool,
    /// Regularisation added to each window's colour covariance
    pub epsilon: f64,
    /// Local window radius; 1 gives the usual 3x3 windows
    pub window_radius: u32,
    /// Weight of the trimap constraints
    pub lambda: f64,
    pub max_iterations: usize,
    /// Relative residual at which the conjugate gradient solve stops
    pub tolerance: f64,
    /// Largest image the solver accepts
    pub max_pixels: u64,
}

impl Default for MattingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            epsilon: DEFAULT_MATTING_EPSILON,
            window_radius: DEFAULT_MATTING_WINDOW_RADIUS,
            lambda: DEFAULT_MATTING_LAMBDA,
            max_iterations: DEFAULT_MATTING_MAX_ITERATIONS,
            tolerance: DEFAULT_MATTING_TOLERANCE,
            max_pixels: DEFAULT_MATTING_MAX_PIXELS,
        }
    }
}

impl MattingConfig {
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub const fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    fn validate(&self) -> Result<(), Error> {
        if self.window_radius == 0 {
            return Err(Error::invalid_config("matting window_radius must be at least 1"));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::invalid_config(format!(
                "matting epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(Error::invalid_config(format!(
                "matting lambda must be positive, got {}",
                self.lambda
            )));
        }
        if self.max_iterations == 0 {
            return Err(Error::invalid_config("matting max_iterations must be at least 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::invalid_config(format!(
                "matting tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Padding applied around the located subject
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub padding_min: u32,
    /// Padding as a fraction of the shorter image side
    pub padding_fraction: f32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            padding_min: DEFAULT_PADDING_MIN,
            padding_fraction: DEFAULT_PADDING_FRACTION,
        }
    }
}

impl LocatorConfig {
    /// `max(padding_min, padding_fraction * min(width, height))`
    #[must_use]
    pub fn padding_for(&self, width: u32, height: u32) -> u32 {
        let scaled = (width.min(height) as f32 * self.padding_fraction) as u32;
        scaled.max(self.padding_min)
    }
}

/// Full set of refinement parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    pub denoise: DenoiseConfig,
    pub watermark_filter: ComponentFilterConfig,
    pub refinement_filter: ComponentFilterConfig,
    pub trimap: TrimapConfig,
    pub matting: MattingConfig,
    pub locator: LocatorConfig,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            denoise: DenoiseConfig::default(),
            watermark_filter: ComponentFilterConfig::watermark_pass(),
            refinement_filter: ComponentFilterConfig::refinement_pass(),
            trimap: TrimapConfig::default(),
            matting: MattingConfig::default(),
            locator: LocatorConfig::default(),
        }
    }
}

impl RefineConfig {
    /// Create a configuration with the reference defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_denoise(mut self, denoise: DenoiseConfig) -> Self {
        self.denoise = denoise;
        self
    }

    #[must_use]
    pub const fn with_watermark_filter(mut self, filter: ComponentFilterConfig) -> Self {
        self.watermark_filter = filter;
        self
    }

    #[must_use]
    pub const fn with_refinement_filter(mut self, filter: ComponentFilterConfig) -> Self {
        self.refinement_filter = filter;
        self
    }

    #[must_use]
    pub const fn with_trimap(mut self, trimap: TrimapConfig) -> Self {
        self.trimap = trimap;
        self
    }

    #[must_use]
    pub const fn with_matting(mut self, matting: MattingConfig) -> Self {
        self.matting = matting;
        self
    }

    #[must_use]
    pub const fn with_locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    /// Rejects values no stage can work with
    ///
    /// # Errors
    ///
    /// * `Error::InvalidConfig` naming the first offending field
    pub fn validate(&self) -> Result<(), Error> {
        self.denoise
            .validate()
            .map_err(|e| Error::invalid_config(format!("denoise: {e}")))?;
        self.watermark_filter
            .validate()
            .map_err(|e| Error::invalid_config(format!("watermark_filter: {e}")))?;
        self.refinement_filter
            .validate()
            .map_err(|e| Error::invalid_config(format!("refinement_filter: {e}")))?;
        if self.trimap.bg_thresh > self.trimap.fg_thresh {
            return Err(Error::invalid_config(format!(
                "trimap bg_thresh ({}) must not exceed fg_thresh ({})",
                self.trimap.bg_thresh, self.trimap.fg_thresh
            )));
        }
        self.matting.validate()?;
        if !(self.locator.padding_fraction.is_finite() && self.locator.padding_fraction >= 0.0) {
            return Err(Error::invalid_config(format!(
                "locator padding_fraction must be non-negative, got {}",
                self.locator.padding_fraction
            )));
        }
        Ok(())
    }
}
