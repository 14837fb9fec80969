//! Immutable audit records appended on every propagation attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::value::ParamValue;

/// Where a value change originated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    /// Direct user interaction; the only source that starts propagation
    #[default]
    User,
    /// Written by the sync coordinator
    Sync,
    /// Restored from a shared URL
    Url,
    /// Host-initiated (defaults, resets)
    System,
}

impl fmt::Display for ChangeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::User => write!(f, "user"),
            Self::Sync => write!(f, "sync"),
            Self::Url => write!(f, "url"),
            Self::System => write!(f, "system"),
        }
    }
}

/// One propagation attempt from a source control to a target control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncEvent {
    pub group_id: String,
    /// Control that received (or would have received) the value
    pub control_id: String,
    /// Control whose change was propagated
    pub source_control_id: String,
    pub old_value: ParamValue,
    pub new_value: ParamValue,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub source: ChangeSource,
    pub propagated: bool,
    /// Why the value was not applied, when `propagated` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SyncEvent {
    /// A value that reached its target.
    pub fn applied(
        group_id: &str,
        source_control_id: &str,
        control_id: &str,
        old_value: ParamValue,
        new_value: ParamValue,
    ) -> Self {
        Self {
            group_id: group_id.to_string(),
            control_id: control_id.to_string(),
            source_control_id: source_control_id.to_string(),
            old_value,
            new_value,
            timestamp: chrono::Utc::now().timestamp_millis(),
            source: ChangeSource::Sync,
            propagated: true,
            reason: None,
        }
    }

    /// A value that was recorded but not applied.
    pub fn skipped(
        group_id: &str,
        source_control_id: &str,
        control_id: &str,
        old_value: ParamValue,
        new_value: ParamValue,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            propagated: false,
            reason: Some(reason.into()),
            ..Self::applied(group_id, source_control_id, control_id, old_value, new_value)
        }
    }

    pub fn with_source(mut self, source: ChangeSource) -> Self {
        self.source = source;
        self
    }
}
