//! Classification engine
//!
//! Wraps a loaded [`ScoringModel`] behind the single `classify` operation:
//! validate the text, score it on the blocking pool under a concurrency
//! limit and a timeout, then turn the raw scores into a ranked result.

use crate::classifier::{Classifier, ScoringModel};
use crate::model_config::EngineConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use triage_core::{ClassificationResult, Error, Precision, Result, TicketText};

pub struct ClassificationEngine {
    model: Arc<dyn ScoringModel>,
    version: String,
    precision: Precision,
    max_input_chars: usize,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ClassificationEngine {
    pub fn new(model: Arc<dyn ScoringModel>, config: &EngineConfig) -> Self {
        Self {
            model,
            version: "unversioned".to_string(),
            precision: config.precision,
            max_input_chars: config.max_input_chars,
            timeout: config.timeout(),
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
        }
    }

    /// Record the version of the artifact the model was loaded from
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    /// Classify already-validated text
    pub async fn classify_text(&self, text: &TicketText) -> Result<ClassificationResult> {
        let start = Instant::now();

        // queueing for a permit counts against the timeout
        let raw = match tokio::time::timeout(self.timeout, self.score(text)).await {
            Ok(scores) => scores?,
            Err(_) => {
                warn!(
                    model = self.model.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Inference timed out"
                );
                metrics::counter!("triage_inference_timeouts_total").increment(1);
                return Err(Error::inference(format!(
                    "inference timed out after {}ms",
                    self.timeout.as_millis()
                )));
            }
        };

        let canonical = self.model.labels().reorder(&raw)?;
        let result = ClassificationResult::from_scores(canonical, self.precision)?;

        let latency_us = start.elapsed().as_micros() as u64;
        metrics::histogram!("triage_inference_latency_us").record(latency_us as f64);
        debug!(
            model = self.model.name(),
            top = %result.top().label,
            confidence = result.top().confidence,
            latency_us,
            "Classified ticket"
        );

        Ok(result)
    }

    async fn score(&self, text: &TicketText) -> Result<Vec<f32>> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::inference("inference pool is closed"))?;

        let model = Arc::clone(&self.model);
        let input = text.as_str().to_owned();

        // the permit moves into the task so an abandoned (timed out) call
        // keeps its slot until the model actually returns
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            model.score(&input)
        })
        .await
        .map_err(|e| Error::inference(format!("inference task failed: {}", e)))?
    }
}

#[async_trait]
impl Classifier for ClassificationEngine {
    async fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let text = TicketText::parse(text, self.max_input_chars)?;
        self.classify_text(&text).await
    }

    fn name(&self) -> &str {
        self.model.name()
    }

    fn version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_core::{Label, LabelMapping};

    struct FixedScorer {
        scores: Vec<f32>,
        mapping: LabelMapping,
    }

    impl ScoringModel for FixedScorer {
        fn score(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.scores.clone())
        }

        fn labels(&self) -> &LabelMapping {
            &self.mapping
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn engine(scores: Vec<f32>, mapping: LabelMapping) -> ClassificationEngine {
        ClassificationEngine::new(Arc::new(FixedScorer { scores, mapping }), &EngineConfig::default())
    }

    #[tokio::test]
    async fn test_scores_are_mapped_through_label_mapping() {
        let mapping = LabelMapping::from_names(&["Other", "Technical", "Billing"]).unwrap();
        let engine = engine(vec![0.1, 0.2, 0.7], mapping);

        let result = engine.classify("refund please").await.unwrap();
        assert_eq!(result.top().label, Label::Billing);
        assert_eq!(result.confidence_of(Label::Other), 0.1);
    }

    #[tokio::test]
    async fn test_confidences_rounded_to_precision() {
        let engine = engine(vec![0.123_456, 0.654_321, 0.222_223], LabelMapping::canonical());

        let result = engine.classify("anything").await.unwrap();
        assert_eq!(result.confidence_of(Label::Billing), 0.1235);
        assert_eq!(result.confidence_of(Label::Technical), 0.6543);
        assert_eq!(result.confidence_of(Label::Other), 0.2222);
    }

    #[tokio::test]
    async fn test_short_score_vector_is_inference_failure() {
        let engine = engine(vec![0.5, 0.5], LabelMapping::canonical());
        let err = engine.classify("anything").await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[tokio::test]
    async fn test_version_is_reported() {
        let engine = engine(vec![0.2, 0.3, 0.5], LabelMapping::canonical()).with_version("abc123");
        assert_eq!(engine.version(), "abc123");
        assert_eq!(engine.name(), "fixed");
    }
}
