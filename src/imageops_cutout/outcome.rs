use std::fmt;

/// Refinement stage that can degrade without failing the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Denoise,
    ComponentFilter,
    Matting,
    BoundingBoxRefinement,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Denoise => "denoise",
            Self::ComponentFilter => "component filter",
            Self::Matting => "matting",
            Self::BoundingBoxRefinement => "bounding box refinement",
        };
        f.write_str(name)
    }
}

/// Record of a stage that fell back to the previous stage's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Degradation {
    pub stage: Stage,
    pub reason: String,
}

impl Degradation {
    pub fn new<S: Into<String>>(stage: Stage, reason: S) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} skipped: {}", self.stage, self.reason)
    }
}

/// Result of a recoverable stage
///
/// A stage either produces its own output or hands back the best output of
/// an earlier stage together with the reason it could not do better.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Ok(T),
    Degraded { value: T, degradation: Degradation },
}

impl<T> StageOutcome<T> {
    /// Build an outcome from a fallible stage, substituting `fallback` on error
    pub fn from_result<E, F>(result: Result<T, E>, stage: Stage, fallback: F) -> Self
    where
        E: fmt::Display,
        F: FnOnce() -> T,
    {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Degraded {
                value: fallback(),
                degradation: Degradation::new(stage, e.to_string()),
            },
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    #[must_use]
    pub const fn degradation(&self) -> Option<&Degradation> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { degradation, .. } => Some(degradation),
        }
    }

    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => value,
        }
    }

    /// Split into the usable value and the degradation, if any
    pub fn into_parts(self) -> (T, Option<Degradation>) {
        match self {
            Self::Ok(value) => (value, None),
            Self::Degraded { value, degradation } => (value, Some(degradation)),
        }
    }
}
