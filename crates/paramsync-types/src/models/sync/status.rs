//! Group status as reported to the host.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Active,
    Paused,
}

/// Per-group propagation phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    PendingPropagation,
    Propagating,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncStatus {
    pub group_id: String,
    pub state: SyncState,
    pub phase: SyncPhase,
    pub pending_conflicts: usize,
    pub last_sync_at: Option<i64>,
    pub history_len: usize,
}
