//! Control store errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ControlType;

/// Errors that can occur while mutating the control-value store.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StoreError {
    /// Control with given ID is not registered
    #[error("Control not found: {id}")]
    ControlNotFound {
        /// Identifier of the missing control
        id: String,
    },

    /// Control is already registered
    #[error("Control already registered: {id}")]
    AlreadyRegistered {
        /// Identifier of the duplicate control
        id: String,
    },

    /// Value does not fit the control's declared type
    #[error("Control {id} expects {expected} but got {actual}")]
    TypeMismatch {
        /// Identifier of the control
        id: String,
        /// Declared control type
        expected: ControlType,
        /// Type of the rejected value
        actual: String,
    },
}
