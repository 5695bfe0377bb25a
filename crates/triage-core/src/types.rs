//! Label set, ticket text, and classification output types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ticket category.
///
/// The declaration order is the canonical order used at training time and
/// for breaking confidence ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Billing,
    Technical,
    Other,
}

impl Label {
    /// All labels in canonical order
    pub const ALL: [Label; 3] = [Label::Billing, Label::Technical, Label::Other];

    /// Size of the label set
    pub const COUNT: usize = Self::ALL.len();

    /// Get the wire name of this label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Billing => "Billing",
            Self::Technical => "Technical",
            Self::Other => "Other",
        }
    }

    /// Position in canonical order
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .iter()
            .find(|label| label.as_str().eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| Error::config(format!("unknown label '{}'", s)))
    }
}

/// Maps a model's output indices onto the closed label set.
///
/// A mapping always covers every [`Label`] exactly once, so a model bound to
/// it can never emit an out-of-domain label or omit one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMapping {
    by_index: Vec<Label>,
}

impl LabelMapping {
    /// Identity mapping (output index == canonical index)
    pub fn canonical() -> Self {
        Self {
            by_index: Label::ALL.to_vec(),
        }
    }

    /// Build a mapping from an artifact's ordered label names
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.len() != Label::COUNT {
            return Err(Error::load(format!(
                "label mapping has {} entries, expected {}",
                names.len(),
                Label::COUNT
            )));
        }

        let mut seen = [false; Label::COUNT];
        let mut by_index = Vec::with_capacity(Label::COUNT);
        for name in names {
            let name = name.as_ref();
            let label: Label = name
                .parse()
                .map_err(|_| Error::load(format!("unknown label '{}' in label mapping", name)))?;
            if seen[label.index()] {
                return Err(Error::load(format!(
                    "label '{}' appears more than once in label mapping",
                    label
                )));
            }
            seen[label.index()] = true;
            by_index.push(label);
        }

        Ok(Self { by_index })
    }

    /// Check that a configured label list is exactly the canonical set, in order
    pub fn validate_configured<S: AsRef<str>>(names: &[S]) -> Result<()> {
        let parsed = names
            .iter()
            .map(|name| name.as_ref().parse::<Label>())
            .collect::<Result<Vec<_>>>()?;

        if parsed.as_slice() != Label::ALL.as_slice() {
            return Err(Error::config(format!(
                "configured labels {:?} do not match the supported label set {:?}",
                parsed, Label::ALL
            )));
        }
        Ok(())
    }

    /// Labels ordered by model output index
    pub fn labels(&self) -> &[Label] {
        &self.by_index
    }

    /// Label emitted at a model output index
    pub fn label_at(&self, index: usize) -> Option<Label> {
        self.by_index.get(index).copied()
    }

    /// Rearrange a raw score vector from output-index order into canonical order
    pub fn reorder(&self, raw: &[f32]) -> Result<[f32; Label::COUNT]> {
        if raw.len() != self.by_index.len() {
            return Err(Error::inference(format!(
                "model produced {} scores, expected {}",
                raw.len(),
                self.by_index.len()
            )));
        }

        let mut canonical = [0.0f32; Label::COUNT];
        for (label, score) in self.by_index.iter().zip(raw) {
            canonical[label.index()] = *score;
        }
        Ok(canonical)
    }
}

/// Validated, non-empty ticket text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketText(String);

impl TicketText {
    /// Validate caller text against the emptiness rule and a character ceiling
    pub fn parse(text: &str, max_chars: usize) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::invalid_input("text must not be empty"));
        }

        let chars = text.chars().count();
        if chars > max_chars {
            return Err(Error::invalid_input(format!(
                "text is {} characters long, the limit is {}",
                chars, max_chars
            )));
        }

        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TicketText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Number of decimal digits reported for confidences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Precision(u32);

impl Precision {
    /// Largest supported precision; f32 carries no more useful digits
    pub const MAX: u32 = 8;

    pub fn new(digits: u32) -> Result<Self> {
        if digits > Self::MAX {
            return Err(Error::config(format!(
                "precision {} exceeds maximum of {} digits",
                digits,
                Self::MAX
            )));
        }
        Ok(Self(digits))
    }

    pub fn digits(&self) -> u32 {
        self.0
    }

    /// Round half away from zero at this precision
    pub fn round(&self, value: f32) -> f32 {
        let factor = 10f64.powi(self.0 as i32);
        ((value as f64 * factor).round() / factor) as f32
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self(4)
    }
}

impl TryFrom<u32> for Precision {
    type Error = Error;

    fn try_from(digits: u32) -> Result<Self> {
        Self::new(digits)
    }
}

impl From<Precision> for u32 {
    fn from(precision: Precision) -> Self {
        precision.0
    }
}

/// Confidence assigned to one label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub confidence: f32,
}

/// Ranked distribution over the full label set.
///
/// Holds exactly one prediction per [`Label`], sorted by descending
/// confidence with ties kept in canonical label order. The only way to
/// build one is [`ClassificationResult::from_scores`]:
///
/// ```compile_fail
/// let _: triage_core::ClassificationResult =
///     serde_json::from_str(r#"{"predictions": []}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    predictions: Vec<Prediction>,
}

impl ClassificationResult {
    /// Build a ranked result from scores given in canonical label order.
    ///
    /// Scores are clamped to [0, 1] and rounded; they are not re-normalized,
    /// so the rounded confidences may drift slightly from a total of 1.0.
    pub fn from_scores(scores: [f32; Label::COUNT], precision: Precision) -> Result<Self> {
        let mut predictions = Vec::with_capacity(Label::COUNT);
        for (label, score) in Label::ALL.iter().zip(scores) {
            if !score.is_finite() {
                return Err(Error::inference(format!(
                    "model produced a non-finite score for {}: {}",
                    label, score
                )));
            }
            // also folds -0.0 into 0.0
            let clamped = if score > 0.0 { score.min(1.0) } else { 0.0 };
            predictions.push(Prediction {
                label: *label,
                confidence: precision.round(clamped),
            });
        }

        // stable: equal confidences keep canonical order
        predictions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        Ok(Self { predictions })
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    pub fn into_predictions(self) -> Vec<Prediction> {
        self.predictions
    }

    /// Highest-ranked prediction
    pub fn top(&self) -> &Prediction {
        &self.predictions[0]
    }

    /// Confidence reported for a specific label
    pub fn confidence_of(&self, label: Label) -> f32 {
        self.predictions
            .iter()
            .find(|p| p.label == label)
            .map(|p| p.confidence)
            .unwrap_or(0.0)
    }

    /// Sum of the reported confidences
    pub fn total_confidence(&self) -> f32 {
        self.predictions.iter().map(|p| p.confidence).sum()
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}
