//! Conflict records for competing writes inside one debounce window.

use serde::{Deserialize, Serialize};

use super::event::ChangeSource;
use crate::models::value::ParamValue;

/// One of the writes that competed inside a debounce window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetingValue {
    pub control_id: String,
    pub value: ParamValue,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub source: ChangeSource,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Pending,
    Resolved,
    Ignored,
}

/// Competing writes to distinct members of one group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConflict {
    pub id: String,
    pub group_id: String,
    /// Control whose write closed the window
    pub control_id: String,
    /// Competing writes in arrival order
    pub values: Vec<CompetingValue>,
    pub status: ConflictStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_value: Option<ParamValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    pub created_at: i64,
}

impl SyncConflict {
    /// Create a pending conflict.
    pub fn new(
        group_id: impl Into<String>,
        control_id: impl Into<String>,
        values: Vec<CompetingValue>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_id: group_id.into(),
            control_id: control_id.into(),
            values,
            status: ConflictStatus::Pending,
            resolved_value: None,
            resolved_at: None,
            resolved_by: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ConflictStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    /// Newest write; on equal timestamps the later arrival wins.
    pub fn latest(&self) -> Option<&CompetingValue> {
        self.values.iter().reduce(|best, v| if v.timestamp >= best.timestamp { v } else { best })
    }

    /// The write made by a given control, if it competed.
    pub fn value_from(&self, control_id: &str) -> Option<&CompetingValue> {
        self.values.iter().rev().find(|v| v.control_id == control_id)
    }

    /// Move to `resolved`. Returns false if the conflict was already terminal.
    pub fn resolve(&mut self, value: ParamValue, resolver: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = ConflictStatus::Resolved;
        self.resolved_value = Some(value);
        self.resolved_at = Some(chrono::Utc::now().timestamp_millis());
        self.resolved_by = Some(resolver.into());
        true
    }

    /// Move to `ignored`. Returns false if the conflict was already terminal.
    pub fn ignore(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = ConflictStatus::Ignored;
        self.resolved_at = Some(chrono::Utc::now().timestamp_millis());
        true
    }
}
