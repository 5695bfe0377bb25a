//! TF-IDF + logistic regression baseline classifier
//!
//! Serves the linear baseline artifact (`baseline.json`): a fitted TF-IDF
//! vocabulary with IDF weights and the coefficients of a multinomial logistic
//! regression over the ticket labels.

use crate::artifact::ArtifactRef;
use crate::classifier::ScoringModel;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use triage_core::{Error, LabelMapping, Result};

/// Word pattern used when the vectorizer was fitted
const TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

#[derive(Debug, Deserialize)]
struct BaselineArtifact {
    labels: Vec<String>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    #[serde(default = "default_true")]
    lowercase: bool,
    #[serde(default)]
    sublinear_tf: bool,
}

fn default_true() -> bool {
    true
}

/// Linear baseline scoring model
pub struct LinearBaselineModel {
    name: String,
    mapping: LabelMapping,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
    lowercase: bool,
    sublinear_tf: bool,
    token_pattern: Regex,
}

impl LinearBaselineModel {
    /// Load the baseline from a resolved artifact directory
    pub fn load(artifact: &ArtifactRef) -> Result<Self> {
        let path = artifact.file("baseline.json");
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::load(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(artifact.name(), &contents)
    }

    /// Build the baseline from the artifact's JSON document
    pub fn from_json(name: impl Into<String>, json: &str) -> Result<Self> {
        let artifact: BaselineArtifact = serde_json::from_str(json)
            .map_err(|e| Error::load(format!("Failed to parse baseline artifact: {}", e)))?;

        let mapping = LabelMapping::from_names(&artifact.labels)?;
        let num_features = artifact.idf.len();

        if artifact.coef.len() != artifact.labels.len() {
            return Err(Error::load(format!(
                "coef has {} rows, expected one per label ({})",
                artifact.coef.len(),
                artifact.labels.len()
            )));
        }
        if let Some(row) = artifact.coef.iter().find(|row| row.len() != num_features) {
            return Err(Error::load(format!(
                "coef row has {} columns, expected {}",
                row.len(),
                num_features
            )));
        }
        if artifact.intercept.len() != artifact.labels.len() {
            return Err(Error::load(format!(
                "intercept has {} entries, expected {}",
                artifact.intercept.len(),
                artifact.labels.len()
            )));
        }
        if let Some((term, column)) = artifact
            .vocabulary
            .iter()
            .find(|entry| *entry.1 >= num_features)
        {
            return Err(Error::load(format!(
                "vocabulary term '{}' points at column {} of {}",
                term, column, num_features
            )));
        }

        let token_pattern = Regex::new(TOKEN_PATTERN)
            .map_err(|e| Error::load(format!("Failed to compile token pattern: {}", e)))?;

        tracing::info!(
            "Loaded linear baseline with {} features and labels {:?}",
            num_features,
            mapping.labels()
        );

        Ok(Self {
            name: name.into(),
            mapping,
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            coef: artifact.coef,
            intercept: artifact.intercept,
            lowercase: artifact.lowercase,
            sublinear_tf: artifact.sublinear_tf,
            token_pattern,
        })
    }

    /// L2-normalised TF-IDF features as (column, weight) pairs
    fn features(&self, text: &str) -> Vec<(usize, f32)> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for token in self.token_pattern.find_iter(&text) {
            if let Some(&column) = self.vocabulary.get(token.as_str()) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut weighted: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(column, count)| {
                let tf = if self.sublinear_tf { count.ln() + 1.0 } else { count };
                (column, tf * self.idf[column])
            })
            .collect();

        let norm = weighted.iter().map(|(_, v)| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, value) in weighted.iter_mut() {
                *value /= norm;
            }
        }
        weighted
    }
}

impl ScoringModel for LinearBaselineModel {
    fn score(&self, text: &str) -> Result<Vec<f32>> {
        let features = self.features(text);

        let logits: Vec<f32> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, bias)| {
                bias + features
                    .iter()
                    .map(|(column, value)| row[*column] * value)
                    .sum::<f32>()
            })
            .collect();

        Ok(softmax(&logits))
    }

    fn labels(&self) -> &LabelMapping {
        &self.mapping
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
