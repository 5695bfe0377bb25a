//! Health reporting derived from the model state

use serde::{Deserialize, Serialize};
use triage_classifiers::ModelState;

/// Overall service status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

/// Body of the health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub model_loaded: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl HealthReport {
    /// Snapshot of `state`; never touches the classifier beyond its identity
    pub fn from_state(state: &ModelState) -> Self {
        match state.classifier() {
            Some(classifier) => Self {
                status: HealthStatus::Ok,
                model_loaded: true,
                model: Some(classifier.name().to_string()),
                version: Some(classifier.version().to_string()),
            },
            None => Self {
                status: HealthStatus::Error,
                model_loaded: false,
                model: None,
                version: None,
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.model_loaded
    }
}
