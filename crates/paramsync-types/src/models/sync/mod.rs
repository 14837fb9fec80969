//! Sync group types.
//!
//! A sync group keeps the values of two or more controls aligned. The types
//! here are the persisted and reported shapes; scheduling and propagation
//! live in `paramsync-core::sync`.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──user change──▶ PendingPropagation ──timer──▶ Propagating ──▶ Idle
//!                          ▲          │
//!                          └─change───┘ (timer restarted, value coalesced)
//! ```

mod conflict;
mod event;
mod group;
mod status;
mod transform;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests;

pub use conflict::{CompetingValue, ConflictStatus, SyncConflict};
pub use event::{ChangeSource, SyncEvent};
pub use group::{ConflictPolicy, SyncGroup, SyncMode};
pub use status::{SyncPhase, SyncState, SyncStatus};
pub use transform::{SyncRule, TransformDescriptor};
