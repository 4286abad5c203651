use thiserror::Error;

/// Error type returned across the pipeline boundary
///
/// Only fatal input problems and configuration problems are represented
/// here. Failures inside a refinement stage are recorded as
/// [`Degradation`](crate::Degradation)s and never surface as an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// The requested canvas has a zero dimension
    #[error("Invalid canvas size {width}x{height}: both dimensions must be positive")]
    InvalidCanvas { width: u32, height: u32 },

    /// A stage configuration value is outside its admissible range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The source bytes could not be decoded into an image
    #[error("Failed to decode source image: {0}")]
    Decode(#[from] image::ImageError),

    /// The segmentation collaborator failed
    #[error("Segmentation failed: {0}")]
    Segmentation(#[from] SegmentationError),

    /// Image and mask dimensions do not match
    #[error("Image and mask dimensions do not match: expected {expected:?}, actual {actual:?}")]
    DimensionMismatch {
        /// Expected dimensions (width, height)
        expected: (u32, u32),
        /// Actual dimensions (width, height)
        actual: (u32, u32),
    },
}

impl Error {
    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Error type for the segmentation model collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentationError {
    /// The model session could not be created
    #[error("Segmentation model unavailable: {0}")]
    Unavailable(String),

    /// The model ran but failed to produce an estimate
    #[error("Segmentation inference failed: {0}")]
    Inference(String),

    /// A previous initialisation attempt panicked while holding the session lock
    #[error("Segmentation session lock poisoned")]
    SessionPoisoned,

    /// The model returned an estimate whose size differs from its input
    #[error("Segmentation output is {actual:?}, expected {expected:?}")]
    OutputDimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Error type for the alpha matting solver
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MattingError {
    /// The solver is not installed or was disabled at build time
    #[error("Matting solver unavailable: {0}")]
    Unavailable(String),

    /// The image exceeds the number of pixels the solver will allocate for
    #[error("Image has {pixels} pixels, solver limit is {limit}")]
    ImageTooLarge { pixels: u64, limit: u64 },

    /// The trimap has no definite foreground or background pixel to anchor the solve
    #[error("Trimap has no known pixels")]
    NoKnownPixels,

    /// The linear solver produced a non-finite residual
    #[error("Matting solver diverged at iteration {iteration}")]
    Diverged { iteration: usize },

    /// Source image and trimap dimensions do not match
    #[error("Image is {image:?} but trimap is {trimap:?}")]
    DimensionMismatch { image: (u32, u32), trimap: (u32, u32) },
}

/// Error type for connected-component filtering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentFilterError {
    /// Invalid parameter provided to the filter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Error type for alpha denoising
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenoiseError {
    /// Invalid parameter provided to the denoiser
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
