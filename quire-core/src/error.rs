//! Workflow error taxonomy.
//!
//! Every operation fails with one of these kinds. Handlers map them onto
//! HTTP statuses; the kind is stable even when the message text changes.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single failed field constraint, preserved through to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All the ways a workflow operation can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// No valid identity on a protected operation.
    #[error("authentication required")]
    Unauthorized,

    /// Valid identity, insufficient role or ownership mismatch.
    #[error("{0}")]
    Forbidden(String),

    /// Referenced document does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Payload failed schema constraints. Field-level messages are kept.
    #[error("validation failed: {}", format_fields(.0))]
    Validation(Vec<FieldError>),

    /// Operation violates the current state-machine position.
    #[error("{0}")]
    Conflict(String),

    /// Persistence layer failure. Retryable from the caller's perspective.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

impl WorkflowError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Single-field validation failure.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(FieldError::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
