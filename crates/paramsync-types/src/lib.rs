//! # paramsync Types
//!
//! Core types, models, and error definitions for paramsync.
//!
//! This crate provides the foundational type system for the paramsync workspace:
//!
//! - **`error`** - Typed error hierarchy for sync, store, query and configuration
//! - **`models`** - Domain models (ControlValue, ParamValue, SyncGroup, SyncConflict, Config)
//!
//! ## Architecture Role
//!
//! `paramsync-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!                paramsync-types (this crate)
//!                        │
//!                        ▼
//!                 paramsync-core
//!                        │
//!                        ▼
//!                 paramsync-cli
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for persistence and host interop
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, QueryError, Result, StoreError, SyncError, TypedError};

// Re-export core model types
pub use models::{
    ChangeSource, CompetingValue, ConflictPolicy, ConflictStatus, ControlType, ControlValue,
    DateRange, NumberRange, ParamValue, ParamsyncConfig, Record, SyncConflict, SyncEvent,
    SyncGroup, SyncMode, SyncPhase, SyncRule, SyncState, SyncStatus, TransformDescriptor,
};
