//! Classifier traits

use async_trait::async_trait;
use triage_core::{ClassificationResult, LabelMapping, Result};

/// A loaded model that turns text into raw per-label probabilities.
///
/// Implementations are blocking and are driven from the engine's worker pool.
pub trait ScoringModel: Send + Sync {
    /// Score the text, returning one probability per model output index
    fn score(&self, text: &str) -> Result<Vec<f32>>;

    /// Mapping from output index to label
    fn labels(&self) -> &LabelMapping;

    /// Get the model name
    fn name(&self) -> &str;
}

/// Trait for ready-to-call ticket classifiers
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given text into a ranked distribution over all labels
    async fn classify(&self, text: &str) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Version of the artifact behind this classifier
    fn version(&self) -> &str;
}
