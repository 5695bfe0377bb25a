//! Server configuration

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use triage_classifiers::{EngineConfig, ModelConfig, ModelSource};
use triage_core::{Label, LabelMapping};

#[derive(Parser, Debug, Default)]
#[command(name = "triage-server")]
#[command(about = "Support ticket classification service", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TRIAGE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Local model artifact directory, overriding the configured source
    #[arg(short, long, env = "TRIAGE_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Listen address
    #[arg(short = 'l', long, env = "TRIAGE_LISTEN")]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "TRIAGE_PORT")]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ListenConfig,

    /// Label set the deployment expects, in canonical order
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_labels() -> Vec<String> {
    Label::ALL.iter().map(|label| label.as_str().to_string()).collect()
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ListenConfig::default(),
            labels: default_labels(),
            model: ModelConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            Self::from_yaml(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(path) = &cli.model_path {
            config.model.source = ModelSource::Local { path: path.clone() };
        }

        if let Some(listen) = &cli.listen {
            config.server.listen = listen.clone();
        }

        if let Some(port) = cli.port {
            config.server.port = port;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Check settings that are independent of the artifact
    pub fn validate(&self) -> anyhow::Result<()> {
        LabelMapping::validate_configured(&self.labels)?;
        if self.server.max_body_bytes == 0 {
            anyhow::bail!("server.max_body_bytes must be at least 1");
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.server.listen, self.server.port).parse()?)
    }
}
