//! Triage Core
//!
//! Core types and error handling shared across the triage ticket classifier.
//!
//! This crate provides:
//! - The closed ticket label set and model label mappings
//! - Validated ticket text
//! - Ranked classification results with fixed output precision
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ClassificationResult, Label, LabelMapping, Precision, Prediction, TicketText};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{
        ClassificationResult, Label, LabelMapping, Precision, Prediction, TicketText,
    };
}
