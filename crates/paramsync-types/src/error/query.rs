//! Query execution errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while running a rendered query through the host executor.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum QueryError {
    /// The rendered query failed validation and execution was blocked
    #[error("Query blocked by validation: {}", errors.join("; "))]
    Validation {
        /// Validation errors that caused the block
        errors: Vec<String>,
        /// Validation warnings collected alongside
        warnings: Vec<String>,
    },

    /// The host execution callback rejected the query
    #[error("Query execution failed after {elapsed_ms}ms: {message}")]
    Execution {
        /// Message reported by the host
        message: String,
        /// Wall time spent before the rejection
        elapsed_ms: u64,
    },
}

impl QueryError {
    /// Elapsed time if the failure came from the executor.
    pub fn elapsed_ms(&self) -> Option<u64> {
        match self {
            Self::Execution { elapsed_ms, .. } => Some(*elapsed_ms),
            Self::Validation { .. } => None,
        }
    }
}
