mod config;
mod error;
mod imageops_cutout;
mod pipeline;
mod session;
mod utils;

#[cfg(test)]
mod test_utils;

use image::{ImageBuffer, Pixel};

pub use config::{
    ComponentFilterConfig, DenoiseConfig, LocatorConfig, MattingConfig, RefineConfig,
    RegionOfInterest, TrimapConfig,
};
pub use error::{ComponentFilterError, DenoiseError, Error, MattingError, SegmentationError};
pub use imageops_cutout::alpha_denoise::DenoiseAlphaExt;
pub use imageops_cutout::apply_alpha_mask::{ApplyAlphaMaskExt, ExtractAlphaExt};
pub use imageops_cutout::box_filter::Plane;
pub use imageops_cutout::components::{ComponentLabelMap, ComponentStats, FilterComponentsExt};
pub use imageops_cutout::compositor::{center_offset, fit_within, CanvasSpec, CompositeExt, Fill};
pub use imageops_cutout::locate::{BoundingBox, LocateObjectExt};
pub use imageops_cutout::matting::{AlphaMatting, ClosedFormMatting, MatteRefiner};
pub use imageops_cutout::outcome::{Degradation, Stage, StageOutcome};
pub use imageops_cutout::summed_area_table::SummedAreaTable;
pub use imageops_cutout::trimap::{
    BuildTrimapExt, Trimap, TRIMAP_BACKGROUND, TRIMAP_FOREGROUND, TRIMAP_UNKNOWN,
};
pub use pipeline::{Pipeline, Refinement};
pub use session::{LazySession, Segmenter};

/// Default stage thresholds
pub mod defaults {
    pub use crate::config::{
        DEFAULT_BG_THRESH, DEFAULT_BLUR_SIGMA, DEFAULT_CLOSE_RADIUS, DEFAULT_COMPONENT_CUTOFF,
        DEFAULT_FG_THRESH, DEFAULT_MATTING_EPSILON, DEFAULT_MATTING_LAMBDA,
        DEFAULT_MATTING_MAX_ITERATIONS, DEFAULT_MATTING_MAX_PIXELS, DEFAULT_MATTING_TOLERANCE,
        DEFAULT_MATTING_WINDOW_RADIUS, DEFAULT_OPEN_RADIUS, DEFAULT_PADDING_FRACTION,
        DEFAULT_PADDING_MIN, DEFAULT_REFINEMENT_CUTOFF, DEFAULT_REFINEMENT_MIN_AREA_FLOOR,
        DEFAULT_REFINEMENT_MIN_AREA_FRACTION, DEFAULT_TOP_MIN_AREA_FLOOR,
        DEFAULT_TOP_MIN_AREA_FRACTION, DEFAULT_TOP_REGION_FRACTION, DEFAULT_TRIMAP_KERNEL_SIZE,
        LARGE_IMAGE_PIXELS, REDUCED_TRIMAP_KERNEL_SIZE,
    };
}

pub type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;
