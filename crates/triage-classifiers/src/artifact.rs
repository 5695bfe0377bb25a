//! Artifact resolution and versioning

use crate::model_config::{Architecture, ModelConfig, ModelSource};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use triage_core::{Error, Result};

/// Immutable handle to a resolved model artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    name: String,
    location: PathBuf,
    version: String,
    architecture: Architecture,
}

impl ArtifactRef {
    /// Resolve a configured source to a local artifact directory
    pub fn resolve(config: &ModelConfig) -> Result<Self> {
        let location = match &config.source {
            ModelSource::Local { path } => {
                if !path.is_dir() {
                    return Err(Error::load(format!(
                        "artifact directory not found: {}",
                        path.display()
                    )));
                }
                path.clone()
            }
            ModelSource::HuggingFace { repo, revision } => {
                download_from_huggingface(repo, revision, config.architecture)?
            }
        };

        let descriptor = location.join(descriptor_file(config.architecture));
        if !descriptor.is_file() {
            return Err(Error::load(format!(
                "{} not found in {}",
                descriptor_file(config.architecture),
                location.display()
            )));
        }

        let version = match &config.version {
            Some(version) => version.clone(),
            None => fingerprint(&descriptor)?,
        };

        Ok(Self {
            name: config.name.clone(),
            location,
            version,
            architecture: config.architecture,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    /// Path of a file inside the artifact directory
    pub fn file(&self, name: &str) -> PathBuf {
        self.location.join(name)
    }
}

/// File that identifies an artifact of the given architecture
pub fn descriptor_file(architecture: Architecture) -> &'static str {
    match architecture {
        Architecture::DistilBertSequenceClassification => "config.json",
        Architecture::LinearBaseline => "baseline.json",
    }
}

/// Short content hash used as the implicit artifact version
fn fingerprint(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::load(format!("failed to read {}: {}", path.display(), e)))?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().take(6).map(|b| format!("{:02x}", b)).collect())
}

#[cfg(feature = "ml-models")]
fn download_from_huggingface(
    repo: &str,
    revision: &str,
    architecture: Architecture,
) -> Result<PathBuf> {
    use hf_hub::{api::sync::Api, Repo, RepoType};

    tracing::info!("Downloading artifact from HuggingFace: {} @ {}", repo, revision);

    let api = Api::new()
        .map_err(|e| Error::load(format!("Failed to initialize HuggingFace API: {}", e)))?;
    let repo_obj = api.repo(Repo::with_revision(
        repo.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    let files: &[&str] = match architecture {
        Architecture::DistilBertSequenceClassification => {
            &["config.json", "tokenizer.json", "model.safetensors"]
        }
        Architecture::LinearBaseline => &["baseline.json"],
    };

    let mut snapshot_dir = None;
    for file in files {
        tracing::debug!("Downloading {}", file);
        let path = repo_obj
            .get(file)
            .map_err(|e| Error::load(format!("Failed to download {}: {}", file, e)))?;
        if snapshot_dir.is_none() {
            snapshot_dir = path.parent().map(Path::to_path_buf);
        }
    }

    snapshot_dir.ok_or_else(|| Error::load("Invalid HuggingFace cache path"))
}

#[cfg(not(feature = "ml-models"))]
fn download_from_huggingface(
    _repo: &str,
    _revision: &str,
    _architecture: Architecture,
) -> Result<PathBuf> {
    Err(Error::load(
        "HuggingFace download requires 'ml-models' feature",
    ))
}
