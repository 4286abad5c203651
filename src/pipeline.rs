//! Orchestration of the refinement stages and the degradation chain.
//!
//! Failures fall into three classes. A refinement stage that fails hands
//! back its input and the run continues; the failure is logged and recorded
//! as a [`Degradation`]. A mask with no foreground left ends the run early
//! with a blank canvas. Undecodable input and segmentation failures abort
//! the run with an [`Error`].

use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, Luma, Rgb, Rgba};
use imageproc::definitions::Image;

use crate::config::RefineConfig;
use crate::error::{Error, SegmentationError};
use crate::imageops_cutout::alpha_denoise::DenoiseAlphaExt;
use crate::imageops_cutout::apply_alpha_mask::{ApplyAlphaMaskExt, ExtractAlphaExt};
use crate::imageops_cutout::components::FilterComponentsExt;
use crate::imageops_cutout::compositor::{CanvasSpec, CompositeExt};
use crate::imageops_cutout::locate::{BoundingBox, LocateObjectExt};
use crate::imageops_cutout::matting::MatteRefiner;
use crate::imageops_cutout::outcome::{Degradation, Stage, StageOutcome};
use crate::imageops_cutout::trimap::BuildTrimapExt;
use crate::session::Segmenter;

/// Everything a run produces before compositing
#[derive(Debug, Clone)]
pub struct Refinement {
    /// Source colours with the final alpha, cropped to `bbox`; `None` when
    /// no foreground survived
    pub subject: Option<Image<Rgba<u8>>>,
    /// Final full-frame alpha
    pub alpha: Image<Luma<u8>>,
    /// Padded box around the surviving foreground
    pub bbox: Option<BoundingBox>,
    /// Stages that fell back to their input, in pipeline order
    pub degradations: Vec<Degradation>,
}

impl Refinement {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.subject.is_none()
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    /// Whether `stage` fell back during this run
    #[must_use]
    pub fn degraded(&self, stage: Stage) -> bool {
        self.degradations.iter().any(|d| d.stage == stage)
    }
}

/// Cut-out pipeline bound to one segmentation session
///
/// A `Pipeline` holds no per-run state and may be shared between threads.
#[derive(Clone)]
pub struct Pipeline {
    segmenter: Arc<dyn Segmenter>,
    refiner: MatteRefiner,
    config: RefineConfig,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("refiner", &self.refiner)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline using the built-in closed-form matting solver
    ///
    /// # Errors
    ///
    /// * `Error::InvalidConfig` - When `config` fails validation
    pub fn new(segmenter: Arc<dyn Segmenter>, config: RefineConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            segmenter,
            refiner: MatteRefiner::closed_form(&config.matting),
            config,
        })
    }

    /// Replaces the matting stage, e.g. with [`MatteRefiner::unavailable`]
    #[must_use]
    pub fn with_matte_refiner(mut self, refiner: MatteRefiner) -> Self {
        self.refiner = refiner;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &RefineConfig {
        &self.config
    }

    /// Decodes an encoded upload and runs [`Pipeline::process`] on it
    ///
    /// # Errors
    ///
    /// * `Error::Decode` - When the bytes are not a supported image
    /// * Everything [`Pipeline::process`] returns
    pub fn process_bytes(&self, bytes: &[u8], canvas: &CanvasSpec) -> Result<DynamicImage, Error> {
        let image = image::load_from_memory(bytes)?.into_rgb8();
        self.process(&image, canvas)
    }

    /// Cuts the subject out of `image` and centers it on `canvas`
    ///
    /// The result is always exactly the canvas size. It is RGB for an opaque
    /// fill and RGBA for a transparent one.
    ///
    /// # Errors
    ///
    /// * `Error::Segmentation` - When the segmentation collaborator fails
    pub fn process(&self, image: &Image<Rgb<u8>>, canvas: &CanvasSpec) -> Result<DynamicImage, Error> {
        let refinement = self.refine(image)?;

        let Some(subject) = refinement.subject else {
            tracing::info!(
                width = canvas.width(),
                height = canvas.height(),
                "no foreground found, returning blank canvas"
            );
            return Ok(canvas.blank());
        };

        let start = Instant::now();
        let output = subject.composite_onto(canvas);
        tracing::debug!(elapsed_ms = start.elapsed().as_millis(), "composite");
        Ok(output)
    }

    /// Segments `image` and runs every refinement stage on the estimate
    ///
    /// # Errors
    ///
    /// * `Error::Segmentation` - When the segmentation collaborator fails or
    ///   returns an estimate of the wrong size
    pub fn refine(&self, image: &Image<Rgb<u8>>) -> Result<Refinement, Error> {
        let (width, height) = image.dimensions();
        let _span = tracing::info_span!("cutout", width, height).entered();

        let start = Instant::now();
        let estimate = self.segmenter.segment(image)?;
        if estimate.dimensions() != image.dimensions() {
            return Err(SegmentationError::OutputDimensionMismatch {
                expected: image.dimensions(),
                actual: estimate.dimensions(),
            }
            .into());
        }
        tracing::debug!(elapsed_ms = start.elapsed().as_millis(), "segmentation");

        self.refine_alpha(image, &estimate.extract_alpha())
    }

    /// Runs the refinement stages on an existing alpha estimate
    ///
    /// # Errors
    ///
    /// * `Error::DimensionMismatch` - When `raw_alpha` and `image` differ in size
    pub fn refine_alpha(
        &self,
        image: &Image<Rgb<u8>>,
        raw_alpha: &Image<Luma<u8>>,
    ) -> Result<Refinement, Error> {
        if raw_alpha.dimensions() != image.dimensions() {
            return Err(Error::DimensionMismatch {
                expected: image.dimensions(),
                actual: raw_alpha.dimensions(),
            });
        }

        let config = &self.config;
        let mut degradations = Vec::new();

        let denoised = timed("denoise", || {
            StageOutcome::from_result(raw_alpha.denoise_alpha(&config.denoise), Stage::Denoise, || {
                raw_alpha.clone()
            })
        });
        let denoised = record(denoised, &mut degradations);

        let filtered = timed("watermark filter", || {
            StageOutcome::from_result(
                denoised.filter_components(&config.watermark_filter),
                Stage::ComponentFilter,
                || denoised.clone(),
            )
        });
        let filtered = record(filtered, &mut degradations);

        let matted = if config.matting.enabled {
            let trimap = timed("trimap", || filtered.build_trimap(&config.trimap));
            tracing::debug!(unknown = trimap.unknown_count(), "trimap unknown band");
            let matted = timed("matting", || self.refiner.refine(image, &trimap, &filtered));
            record(matted, &mut degradations)
        } else {
            tracing::debug!("matting disabled");
            filtered
        };

        let alpha = timed("bounding box filter", || {
            StageOutcome::from_result(
                matted.filter_components(&config.refinement_filter),
                Stage::BoundingBoxRefinement,
                || matted.clone(),
            )
        });
        let alpha = record(alpha, &mut degradations);

        let bbox = alpha.locate_object(&config.locator);
        let subject = match bbox {
            Some(bbox) => Some(bbox.crop(&image.apply_alpha_mask(&alpha)?)),
            None => None,
        };

        Ok(Refinement {
            subject,
            alpha,
            bbox,
            degradations,
        })
    }
}

/// Unwraps a stage outcome, logging and keeping its degradation
fn record<T>(outcome: StageOutcome<T>, degradations: &mut Vec<Degradation>) -> T {
    let (value, degradation) = outcome.into_parts();
    if let Some(degradation) = degradation {
        tracing::warn!(
            stage = %degradation.stage,
            reason = %degradation.reason,
            "refinement stage degraded"
        );
        degradations.push(degradation);
    }
    value
}

fn timed<T>(stage: &'static str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let value = f();
    tracing::debug!(stage, elapsed_ms = start.elapsed().as_millis(), "stage finished");
    value
}
