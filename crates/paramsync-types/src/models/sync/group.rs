//! Sync group definition and structural validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::SyncError;
use crate::models::config::default_true;

/// How values flow between group members.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Any member's change flows to every other member
    #[default]
    Bidirectional,
    /// Only the master's changes flow out
    MasterSlave,
    /// Any member's change flows out with no conflict detection
    Broadcast,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Bidirectional => write!(f, "bidirectional"),
            Self::MasterSlave => write!(f, "master_slave"),
            Self::Broadcast => write!(f, "broadcast"),
        }
    }
}

impl SyncMode {
    /// Whether competing writes inside one window are treated as a conflict.
    pub fn detects_conflicts(self) -> bool {
        !matches!(self, Self::Broadcast)
    }
}

/// How a detected conflict is settled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Newest timestamp wins
    #[default]
    LatestWins,
    /// The master's value wins
    MasterWins,
    /// Left pending for external resolution
    Manual,
    /// A registered combinator folds the competing values
    Merge,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LatestWins => write!(f, "latest_wins"),
            Self::MasterWins => write!(f, "master_wins"),
            Self::Manual => write!(f, "manual"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// A named set of controls kept in sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncGroup {
    /// Unique group identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Ordered member control ids (at least two, unique)
    pub members: Vec<String>,
    /// Propagation mode
    #[serde(default)]
    pub mode: SyncMode,
    /// Master control (required in master-slave mode, optional otherwise; always a member)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_id: Option<String>,
    /// Conflict resolution policy
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Disabled groups keep their definition but never propagate
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Unix timestamp in milliseconds of the last propagation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<i64>,
}

impl SyncGroup {
    /// Create an enabled group with a fresh id and the default policy.
    pub fn new<I, S>(name: impl Into<String>, members: I, mode: SyncMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
            mode,
            master_id: None,
            conflict_policy: ConflictPolicy::default(),
            enabled: true,
            last_sync_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_master(mut self, master_id: impl Into<String>) -> Self {
        self.master_id = Some(master_id.into());
        self
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn contains(&self, control_id: &str) -> bool {
        self.members.iter().any(|m| m == control_id)
    }

    pub fn is_master(&self, control_id: &str) -> bool {
        self.master_id.as_deref() == Some(control_id)
    }

    /// Members other than `control_id`, in declaration order.
    pub fn others<'a>(&'a self, control_id: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.members.iter().filter(move |m| m.as_str() != control_id)
    }

    /// Check the structural rules of a group definition.
    pub fn validate(&self) -> Result<(), SyncError> {
        let invalid = |message: &str| SyncError::InvalidGroup {
            id: self.id.clone(),
            message: message.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("group id must not be empty"));
        }
        if self.members.len() < 2 {
            return Err(invalid("a sync group needs at least two members"));
        }
        if self.members.iter().any(|m| m.trim().is_empty()) {
            return Err(invalid("member ids must not be empty"));
        }
        let unique: HashSet<&str> = self.members.iter().map(String::as_str).collect();
        if unique.len() != self.members.len() {
            return Err(invalid("member ids must be unique"));
        }

        match self.master_id.as_deref() {
            None if self.mode == SyncMode::MasterSlave => {
                return Err(invalid("master_slave mode requires a master control"));
            },
            Some(master) if !self.contains(master) => {
                return Err(invalid("master control must be a member of the group"));
            },
            _ => {},
        }

        if self.conflict_policy == ConflictPolicy::MasterWins && self.master_id.is_none() {
            return Err(invalid("master_wins policy requires a master control"));
        }

        Ok(())
    }
}
