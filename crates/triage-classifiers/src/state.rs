//! Model lifecycle state

use crate::classifier::Classifier;
use std::fmt;
use std::sync::{Arc, OnceLock};
use triage_core::{Error, Result};

/// Lifecycle status of the classifier in this process
#[derive(Clone)]
pub enum ModelState {
    /// Load has not completed yet
    Unloaded,

    /// Model loaded and callable
    Ready(Arc<dyn Classifier>),

    /// Load failed; the reason is human-readable
    Failed(String),
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The classifier, when ready
    pub fn classifier(&self) -> Option<&Arc<dyn Classifier>> {
        match self {
            Self::Ready(classifier) => Some(classifier),
            _ => None,
        }
    }

    /// The classifier, or an `Unavailable` error explaining why there is none
    pub fn ready_classifier(&self) -> Result<&Arc<dyn Classifier>> {
        match self {
            Self::Ready(classifier) => Ok(classifier),
            Self::Unloaded => Err(Error::unavailable("model has not been loaded")),
            Self::Failed(reason) => Err(Error::unavailable(reason.clone())),
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Short name for logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

impl fmt::Debug for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => f.write_str("Unloaded"),
            Self::Ready(classifier) => f
                .debug_tuple("Ready")
                .field(&format_args!("{}@{}", classifier.name(), classifier.version()))
                .finish(),
            Self::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
        }
    }
}

static UNLOADED: ModelState = ModelState::Unloaded;

/// Holder for the process-wide model state.
///
/// Starts `Unloaded` and accepts exactly one transition, to `Ready` or
/// `Failed`. Readers share it through an `Arc` and never see it change again.
#[derive(Debug, Default)]
pub struct ModelCell {
    state: OnceLock<ModelState>,
}

impl ModelCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cell that has already transitioned to `state`
    pub fn with_state(state: ModelState) -> Result<Self> {
        let cell = Self::new();
        cell.transition(state)?;
        Ok(cell)
    }

    /// Perform the single allowed transition out of `Unloaded`
    pub fn transition(&self, state: ModelState) -> Result<()> {
        if matches!(state, ModelState::Unloaded) {
            return Err(Error::config("model state cannot transition back to Unloaded"));
        }

        self.state.set(state).map_err(|rejected| {
            Error::config(format!(
                "model state already transitioned; rejected {}",
                rejected.as_str()
            ))
        })
    }

    /// Current state
    pub fn state(&self) -> &ModelState {
        self.state.get().unwrap_or(&UNLOADED)
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }
}
