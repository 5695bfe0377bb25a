//! Service layer
//!
//! Translates between requests and the model lifecycle: input is validated
//! first, then the model state is checked, then the classifier is called.
//! Inference details stay in the logs.

use crate::health::HealthReport;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info_span, warn, Instrument};
use triage_classifiers::{ModelCell, ModelState};
use triage_core::{ClassificationResult, Error};

/// Static identification message
pub const WELCOME_MESSAGE: &str = "Welcome to the Support Ticket Classifier API!";

pub const UNAVAILABLE_MESSAGE: &str = "Model is not available.";

pub const INTERNAL_MESSAGE: &str = "Classification failed. Please try again later.";

/// Request outcomes other than success
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Missing, empty or oversized text
    #[error("{0}")]
    InvalidInput(String),

    /// No ready model
    #[error("{}", UNAVAILABLE_MESSAGE)]
    Unavailable,

    /// Inference failed; the cause was logged
    #[error("{}", INTERNAL_MESSAGE)]
    Internal,
}

impl ServiceError {
    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_request_error",
            Self::Unavailable => "service_unavailable",
            Self::Internal => "internal_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TicketService {
    model: Arc<ModelCell>,
}

impl TicketService {
    pub fn new(model: Arc<ModelCell>) -> Self {
        Self { model }
    }

    pub fn model_state(&self) -> &ModelState {
        self.model.state()
    }

    pub fn describe(&self) -> &'static str {
        WELCOME_MESSAGE
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::from_state(self.model.state())
    }

    /// Classify `text`, which is `None` when the request carried no text field
    pub async fn predict(&self, text: Option<&str>) -> Result<ClassificationResult, ServiceError> {
        let text = match text {
            Some(text) if !text.trim().is_empty() => text,
            Some(_) => return Err(ServiceError::InvalidInput("text must not be empty".into())),
            None => return Err(ServiceError::InvalidInput("text is required".into())),
        };

        let state = self.model.state();
        let classifier = state.ready_classifier().map_err(|e| {
            warn!(state = state.as_str(), "Prediction requested without a ready model: {}", e);
            ServiceError::Unavailable
        })?;

        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("predict", %request_id, model = classifier.name());
        let start = Instant::now();

        match classifier.classify(text).instrument(span.clone()).await {
            Ok(result) => {
                span.in_scope(|| {
                    debug!(
                        top = %result.top().label,
                        elapsed_us = start.elapsed().as_micros() as u64,
                        "Prediction complete"
                    )
                });
                Ok(result)
            }
            Err(Error::InvalidInput(msg)) => Err(ServiceError::InvalidInput(msg)),
            Err(e) => {
                span.in_scope(|| error!("Prediction failed: {}", e));
                Err(ServiceError::Internal)
            }
        }
    }
}
