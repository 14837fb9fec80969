//! Typed error definitions for paramsync.
//!
//! This module provides a structured error hierarchy with specific error types
//! for different domains. All errors are designed to be:
//!
//! - **Serializable** for host responses via serde
//! - **Displayable** for logging via Display trait
//! - **Matchable** for error handling logic via enum variants
//! - **Composable** via thiserror derive macros
//!
//! Query validation failures are deliberately absent here: an unsafe template
//! is reported as a `ValidationReport` value, not raised as an error.

mod config;
mod query;
mod store;
mod sync;

pub use config::ConfigError;
pub use query::QueryError;
pub use store::StoreError;
pub use sync::SyncError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type that wraps all domain-specific errors.
///
/// Use this when you need a single error type that can represent
/// any paramsync error.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "domain", content = "error")]
pub enum TypedError {
    /// Wraps a sync coordination error
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Wraps a control store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Wraps a query execution error
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Wraps a configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl TypedError {
    /// Whether this error signals a state-consistency bug (unknown id).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Sync(e) => e.is_not_found(),
            Self::Store(e) => matches!(e, StoreError::ControlNotFound { .. }),
            Self::Config(e) => matches!(e, ConfigError::NotFound { .. }),
            Self::Query(_) => false,
        }
    }
}

/// Standard Result type using TypedError.
pub type Result<T> = std::result::Result<T, TypedError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = TypedError::Sync(SyncError::ConflictNotFound { id: "c-123".to_string() });

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Sync"));
        assert!(json.contains("c-123"));

        let deserialized: TypedError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_error_display() {
        let err = QueryError::Execution { message: "connection reset".to_string(), elapsed_ms: 42 };

        let msg = format!("{}", err);
        assert!(msg.contains("connection reset"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_not_found_classification() {
        let missing: TypedError = SyncError::GroupNotFound { id: "g".into() }.into();
        assert!(missing.is_not_found());

        let invalid: TypedError =
            SyncError::InvalidGroup { id: "g".into(), message: "too few members".into() }.into();
        assert!(!invalid.is_not_found());
    }
}
