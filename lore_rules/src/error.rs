//! Error types for rule storage and interchange.

use thiserror::Error;

use crate::rule::RuleId;

/// Errors raised by the rule store and import/export.
#[derive(Error, Debug)]
pub enum RuleError {
    /// The rule failed validation; every problem is listed.
    #[error("rule {id} is invalid: {}", .errors.join("; "))]
    Invalid { id: RuleId, errors: Vec<String> },

    /// No rule with this ID exists in the store.
    #[error("rule not found: {0}")]
    NotFound(RuleId),

    /// A rule with this ID already exists in the store.
    #[error("duplicate rule id: {0}")]
    DuplicateId(RuleId),

    /// The input was not valid JSON, or could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON was well-formed but not a recognised document shape.
    #[error("unsupported format: {0}")]
    Unsupported(String),
}

pub type RuleResult<T> = Result<T, RuleError>;
