//! Unified error types for paramsync Core.

use paramsync_types::TypedError;
use serde::Serialize;
use thiserror::Error;

/// Main error type for all paramsync operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    /// Domain error from the typed hierarchy.
    #[error(transparent)]
    Typed(#[from] TypedError),

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unclassified error with message.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

/// Result type alias for paramsync operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<paramsync_types::SyncError> for AppError {
    fn from(e: paramsync_types::SyncError) -> Self {
        AppError::Typed(e.into())
    }
}

impl From<paramsync_types::StoreError> for AppError {
    fn from(e: paramsync_types::StoreError) -> Self {
        AppError::Typed(e.into())
    }
}

impl From<paramsync_types::QueryError> for AppError {
    fn from(e: paramsync_types::QueryError) -> Self {
        AppError::Typed(e.into())
    }
}

impl From<paramsync_types::ConfigError> for AppError {
    fn from(e: paramsync_types::ConfigError) -> Self {
        AppError::Typed(e.into())
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Unknown(s)
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::Unknown(s.to_string())
    }
}
