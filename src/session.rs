//! Segmentation model collaborator and its process-wide session handle.
//!
//! The model itself lives outside this crate. [`Segmenter`] is the seam the
//! pipeline calls through; [`LazySession`] defers construction of an
//! expensive session until the first request and then shares it read-only.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use image::{Rgb, Rgba};
use imageproc::definitions::Image;

use crate::error::SegmentationError;

/// Neural foreground estimator
///
/// Given an RGB image, returns an RGBA image of identical dimensions whose
/// alpha channel is the model's foreground coverage estimate.
pub trait Segmenter: Send + Sync {
    /// # Errors
    ///
    /// Any [`SegmentationError`]; the pipeline treats every one as fatal.
    fn segment(&self, image: &Image<Rgb<u8>>) -> Result<Image<Rgba<u8>>, SegmentationError>;
}

impl<S: Segmenter + ?Sized> Segmenter for Arc<S> {
    fn segment(&self, image: &Image<Rgb<u8>>) -> Result<Image<Rgba<u8>>, SegmentationError> {
        (**self).segment(image)
    }
}

type SessionFactory<S> = Box<dyn Fn() -> Result<S, SegmentationError> + Send + Sync>;

/// Session built on first use and shared afterwards
///
/// Construction runs at most once per handle even when many threads race on
/// the first call. A failed construction is not remembered; the next caller
/// retries.
pub struct LazySession<S> {
    factory: SessionFactory<S>,
    session: OnceLock<Arc<S>>,
    init_lock: Mutex<()>,
}

impl<S> fmt::Debug for LazySession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySession")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl<S> LazySession<S> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Result<S, SegmentationError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            session: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    /// Returns the shared session, building it if this is the first call
    ///
    /// # Errors
    ///
    /// * The factory's error when construction fails
    /// * `SegmentationError::SessionPoisoned` - When a previous construction panicked
    pub fn get(&self) -> Result<Arc<S>, SegmentationError> {
        if let Some(session) = self.session.get() {
            return Ok(Arc::clone(session));
        }

        let _guard = self
            .init_lock
            .lock()
            .map_err(|_| SegmentationError::SessionPoisoned)?;

        // another thread may have finished while we waited for the lock
        if let Some(session) = self.session.get() {
            return Ok(Arc::clone(session));
        }

        tracing::info!("initializing segmentation session");
        let start = Instant::now();
        let session = Arc::new((self.factory)()?);
        let session = Arc::clone(self.session.get_or_init(|| session));
        tracing::info!(elapsed_ms = start.elapsed().as_millis(), "segmentation session ready");

        Ok(session)
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.session.get().is_some()
    }
}

impl<S: Segmenter> Segmenter for LazySession<S> {
    fn segment(&self, image: &Image<Rgb<u8>>) -> Result<Image<Rgba<u8>>, SegmentationError> {
        self.get()?.segment(image)
    }
}
