//! Model and engine configuration structures

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use triage_core::{Error, Precision, Result};

/// Configuration for the model artifact to serve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name, reported by the health endpoint
    #[serde(default = "default_name")]
    pub name: String,

    /// Explicit artifact version; derived from the artifact contents when unset
    #[serde(default)]
    pub version: Option<String>,

    /// Where to load the artifact from
    pub source: ModelSource,

    /// Artifact architecture
    #[serde(default)]
    pub architecture: Architecture,

    /// Device to run on (cpu, cuda, metal)
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum sequence length in tokens
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

/// Model source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelSource {
    /// Load from local filesystem
    Local { path: PathBuf },

    /// Download from HuggingFace Hub
    HuggingFace {
        repo: String,
        #[serde(default = "default_revision")]
        revision: String,
    },
}

/// Supported artifact layouts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Architecture {
    /// Fine-tuned DistilBERT exported in Hugging Face format
    #[default]
    DistilBertSequenceClassification,

    /// TF-IDF features with a multinomial logistic regression head
    LinearBaseline,
}

fn default_name() -> String {
    "ticket-classifier".to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    128
}

impl ModelConfig {
    /// Create a configuration for a local artifact directory
    pub fn from_local(path: impl Into<PathBuf>, architecture: Architecture) -> Self {
        Self {
            name: default_name(),
            version: None,
            source: ModelSource::Local { path: path.into() },
            architecture,
            device: default_device(),
            max_length: default_max_length(),
        }
    }

    /// Set model name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pin the artifact version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::from_local(
            "./models/ticket_classifier",
            Architecture::DistilBertSequenceClassification,
        )
    }
}

/// Runtime settings for the classification engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Decimal digits reported for each confidence
    #[serde(default)]
    pub precision: Precision,

    /// Maximum number of concurrent inference calls
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per-call inference timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Longest accepted ticket text, in characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

fn default_max_concurrency() -> usize {
    num_cpus::get().max(1)
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_input_chars() -> usize {
    10_000
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reject settings that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::config("engine.max_concurrency must be at least 1"));
        }
        if self.timeout_ms == 0 {
            return Err(Error::config("engine.timeout_ms must be at least 1"));
        }
        if self.max_input_chars == 0 {
            return Err(Error::config("engine.max_input_chars must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            precision: Precision::default(),
            max_concurrency: default_max_concurrency(),
            timeout_ms: default_timeout_ms(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_model_config() {
        let yaml = r#"
name: "ticket-distilbert"
version: "2024-06-01"
source:
  type: local
  path: "./models/ticket_classifier"
architecture: distil-bert-sequence-classification
device: "cpu"
max_length: 128
"#;

        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "ticket-distilbert");
        assert_eq!(config.version.as_deref(), Some("2024-06-01"));
        assert_eq!(
            config.source,
            ModelSource::Local {
                path: PathBuf::from("./models/ticket_classifier")
            }
        );
        assert_eq!(config.max_length, 128);
    }

    #[test]
    fn test_huggingface_source_defaults_revision() {
        let yaml = r#"
source:
  type: huggingface
  repo: "acme/ticket-classifier"
architecture: linear-baseline
"#;

        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.architecture, Architecture::LinearBaseline);
        match &config.source {
            ModelSource::HuggingFace { repo, revision } => {
                assert_eq!(repo, "acme/ticket-classifier");
                assert_eq!(revision, "main");
            }
            _ => panic!("Expected HuggingFace source"),
        }
        assert_eq!(config.device, "cpu");
        assert_eq!(config.name, "ticket-classifier");
    }

    #[test]
    fn test_engine_config_defaults() {
        let config: EngineConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.precision.digits(), 4);
        assert!(config.max_concurrency >= 1);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_config_rejects_bad_values() {
        assert!(serde_yaml::from_str::<EngineConfig>("precision: 12").is_err());

        let config = EngineConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
