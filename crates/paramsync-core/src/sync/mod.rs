//! Sync coordination between grouped controls.
//!
//! [`SyncCoordinator`] is the only writer of propagated values. A user change
//! on a group member opens (or extends) the group's debounce window; when the
//! window closes the coordinator checks for competing writes, settles them by
//! the group's [`ConflictPolicy`](paramsync_types::ConflictPolicy) and pushes
//! the result to the other members with [`ChangeSource::Sync`], which never
//! starts another window.
//!
//! [`ChangeSource::Sync`]: paramsync_types::ChangeSource::Sync

mod coordinator;
mod history;
pub mod merge;


pub use coordinator::SyncCoordinator;
pub use merge::MergeFn;
