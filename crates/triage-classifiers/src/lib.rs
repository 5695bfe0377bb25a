//! Triage Classifiers
//!
//! Model lifecycle and inference for support ticket triage.
//!
//! A trained artifact is loaded once at startup by [`ModelLoader`], which
//! always produces a [`ModelState`]: `Ready` with a callable
//! [`ClassificationEngine`], or `Failed` with a reason. Two artifact layouts
//! are served:
//! - Fine-tuned DistilBERT exported in Hugging Face format (Candle)
//! - TF-IDF + logistic regression baseline (`baseline.json`)

pub mod artifact;
pub mod classifier;
#[cfg(feature = "ml-models")]
pub mod distilbert;
pub mod engine;
pub mod linear;
pub mod model_config;
pub mod model_loader;
pub mod state;

pub use artifact::ArtifactRef;
pub use classifier::{Classifier, ScoringModel};
pub use engine::ClassificationEngine;
pub use linear::LinearBaselineModel;
pub use model_config::{Architecture, EngineConfig, ModelConfig, ModelSource};
pub use model_loader::ModelLoader;
pub use state::{ModelCell, ModelState};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{Classifier, ScoringModel};
    pub use crate::engine::ClassificationEngine;
    pub use crate::model_config::{Architecture, EngineConfig, ModelConfig, ModelSource};
    pub use crate::model_loader::ModelLoader;
    pub use crate::state::{ModelCell, ModelState};
}
