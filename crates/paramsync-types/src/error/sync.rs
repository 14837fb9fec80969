//! Sync coordination errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during sync group operations.
///
/// The `*NotFound` variants are hard failures: they mean the caller holds an
/// id that the coordinator never issued or already dropped.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum SyncError {
    /// Sync group with given ID not found
    #[error("Sync group not found: {id}")]
    GroupNotFound {
        /// Identifier of the missing group
        id: String,
    },

    /// Sync rule with given ID not found
    #[error("Sync rule not found: {id}")]
    RuleNotFound {
        /// Identifier of the missing rule
        id: String,
    },

    /// Sync conflict with given ID not found
    #[error("Sync conflict not found: {id}")]
    ConflictNotFound {
        /// Identifier of the missing conflict
        id: String,
    },

    /// Control is not a member of the group
    #[error("Control {control_id} is not a member of group {group_id}")]
    NotAMember {
        /// Group that was addressed
        group_id: String,
        /// Control that is not a member
        control_id: String,
    },

    /// Group definition violates a structural rule
    #[error("Invalid sync group {id}: {message}")]
    InvalidGroup {
        /// Identifier of the offending group
        id: String,
        /// Description of the violated rule
        message: String,
    },

    /// Persistence backend failed
    #[error("Sync repository error: {message}")]
    Repository {
        /// Description of the backend failure
        message: String,
    },
}

impl SyncError {
    /// Check if this error refers to an unknown id.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GroupNotFound { .. } | Self::RuleNotFound { .. } | Self::ConflictNotFound { .. }
        )
    }
}
