//! Fail-soft model loading
//!
//! The loader is the only place a [`ModelState`] is produced. Whatever goes
//! wrong while materializing the artifact, the caller gets `Failed(reason)`
//! back instead of an error, so the service can still start and report it.

use crate::artifact::ArtifactRef;
use crate::classifier::{Classifier, ScoringModel};
use crate::engine::ClassificationEngine;
use crate::linear::LinearBaselineModel;
use crate::model_config::{Architecture, EngineConfig, ModelConfig};
use crate::state::ModelState;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use triage_core::Result;

pub struct ModelLoader;

impl ModelLoader {
    /// Load the configured artifact, never failing past this boundary
    pub fn load(model: &ModelConfig, engine: &EngineConfig) -> ModelState {
        info!(
            "Loading model '{}' ({:?}) from {:?}",
            model.name, model.architecture, model.source
        );
        Self::load_with(&model.name, || Self::try_load(model, engine))
    }

    /// Run `build` and turn its outcome, including a panic, into a state
    pub fn load_with<F>(name: &str, build: F) -> ModelState
    where
        F: FnOnce() -> Result<ClassificationEngine>,
    {
        let start = Instant::now();

        match panic::catch_unwind(AssertUnwindSafe(build)) {
            Ok(Ok(engine)) => {
                info!(
                    model = %name,
                    version = %engine.version(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Model loaded successfully"
                );
                ModelState::Ready(Arc::new(engine))
            }
            Ok(Err(e)) => {
                error!("Error loading model '{}': {}", name, e);
                ModelState::Failed(e.to_string())
            }
            Err(payload) => {
                let reason = format!("model loader panicked: {}", panic_message(payload.as_ref()));
                error!("Error loading model '{}': {}", name, reason);
                ModelState::Failed(reason)
            }
        }
    }

    /// Build the engine for the configured artifact, reporting the first failure
    pub fn try_load(model: &ModelConfig, engine: &EngineConfig) -> Result<ClassificationEngine> {
        engine.validate()?;
        let artifact = ArtifactRef::resolve(model)?;

        let scorer: Arc<dyn ScoringModel> = match artifact.architecture() {
            Architecture::DistilBertSequenceClassification => load_distilbert(&artifact, model)?,
            Architecture::LinearBaseline => Arc::new(LinearBaselineModel::load(&artifact)?),
        };

        Ok(ClassificationEngine::new(scorer, engine).with_version(artifact.version()))
    }
}

#[cfg(feature = "ml-models")]
fn load_distilbert(artifact: &ArtifactRef, model: &ModelConfig) -> Result<Arc<dyn ScoringModel>> {
    let classifier = crate::distilbert::DistilBertSequenceClassifier::load(artifact, model)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "ml-models"))]
fn load_distilbert(_artifact: &ArtifactRef, _model: &ModelConfig) -> Result<Arc<dyn ScoringModel>> {
    Err(triage_core::Error::load(
        "DistilBERT artifacts require the 'ml-models' feature",
    ))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
