//! Mock scoring models for testing
//!
//! Provides configurable implementations of the ScoringModel trait for
//! exercising the engine's validation, concurrency, timeout and error paths.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use triage_classifiers::{ClassificationEngine, Classifier, EngineConfig, ScoringModel};
use triage_core::{Error, Label, LabelMapping, Result};

/// A configurable mock scorer for testing
pub struct MockScorer {
    scores: Vec<f32>,
    mapping: LabelMapping,
    simulated_latency: Option<Duration>,
    call_count: AtomicU32,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockScorer {
    /// Create a mock returning the given scores in canonical label order
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            mapping: LabelMapping::canonical(),
            simulated_latency: None,
            call_count: AtomicU32::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Set simulated latency for this scorer
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    /// Get the number of times score was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous score calls observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ScoringModel for MockScorer {
    fn score(&self, text: &str) -> Result<Vec<f32>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.simulated_latency {
            std::thread::sleep(latency);
        }

        let scores = match text {
            t if t.contains("PANIC") => panic!("scorer exploded"),
            t if t.contains("FAIL") => Err(Error::inference("backend unavailable")),
            t if t.contains("NAN") => Ok(vec![f32::NAN, 0.5, 0.5]),
            _ => Ok(self.scores.clone()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        scores
    }

    fn labels(&self) -> &LabelMapping {
        &self.mapping
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn engine_with(scorer: Arc<MockScorer>, config: EngineConfig) -> ClassificationEngine {
    ClassificationEngine::new(scorer, &config)
}

#[tokio::test]
async fn test_returns_full_ranked_distribution() {
    let scorer = Arc::new(MockScorer::new(vec![0.7, 0.2, 0.1]));
    let engine = engine_with(scorer.clone(), EngineConfig::default());

    let result = engine.classify("My invoice is wrong").await.unwrap();

    assert_eq!(result.len(), Label::COUNT);
    assert_eq!(result.top().label, Label::Billing);
    for pair in result.predictions().windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
    assert!((result.total_confidence() - 1.0).abs() <= 1e-3);
    assert_eq!(scorer.call_count(), 1);
}

#[tokio::test]
async fn test_empty_text_never_reaches_model() {
    let scorer = Arc::new(MockScorer::new(vec![0.7, 0.2, 0.1]));
    let engine = engine_with(scorer.clone(), EngineConfig::default());

    for text in ["", "   ", "\n\t"] {
        let err = engine.classify(text).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
    assert_eq!(scorer.call_count(), 0);
}

#[tokio::test]
async fn test_oversized_text_is_invalid_input() {
    let scorer = Arc::new(MockScorer::new(vec![0.7, 0.2, 0.1]));
    let config = EngineConfig {
        max_input_chars: 16,
        ..Default::default()
    };
    let engine = engine_with(scorer.clone(), config);

    let err = engine.classify(&"x".repeat(17)).await.unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(scorer.call_count(), 0);
}

#[tokio::test]
async fn test_repeated_calls_are_identical() {
    let scorer = Arc::new(MockScorer::new(vec![0.3333, 0.3334, 0.3333]));
    let engine = engine_with(scorer, EngineConfig::default());

    let first = engine.classify("app crashes on login").await.unwrap();
    for _ in 0..5 {
        assert_eq!(engine.classify("app crashes on login").await.unwrap(), first);
    }
}

#[tokio::test]
async fn test_nan_scores_are_inference_failures() {
    let engine = engine_with(Arc::new(MockScorer::new(vec![0.5, 0.3, 0.2])), EngineConfig::default());

    let err = engine.classify("NAN please").await.unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[tokio::test]
async fn test_backend_error_is_inference_failure() {
    let engine = engine_with(Arc::new(MockScorer::new(vec![0.5, 0.3, 0.2])), EngineConfig::default());

    let err = engine.classify("FAIL please").await.unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[tokio::test]
async fn test_scorer_panic_is_contained() {
    let engine = engine_with(Arc::new(MockScorer::new(vec![0.5, 0.3, 0.2])), EngineConfig::default());

    let err = engine.classify("PANIC please").await.unwrap_err();
    assert!(matches!(err, Error::Inference(_)));

    // engine stays usable
    assert!(engine.classify("refund").await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_inference_times_out() {
    let scorer = Arc::new(MockScorer::new(vec![0.5, 0.3, 0.2]).with_latency(Duration::from_millis(300)));
    let config = EngineConfig {
        timeout_ms: 20,
        ..Default::default()
    };
    let engine = engine_with(scorer, config);

    let err = engine.classify("slow ticket").await.unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_limit_serializes_calls() {
    let scorer = Arc::new(MockScorer::new(vec![0.5, 0.3, 0.2]).with_latency(Duration::from_millis(25)));
    let config = EngineConfig {
        max_concurrency: 1,
        ..Default::default()
    };
    let engine = Arc::new(engine_with(scorer.clone(), config));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.classify(&format!("ticket {}", i)).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(scorer.call_count(), 4);
    assert_eq!(scorer.max_in_flight(), 1);
}
