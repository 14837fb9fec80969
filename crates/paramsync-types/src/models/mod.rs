//! Core domain models for paramsync.
//!
//! This module contains all shared data structures used across the paramsync workspace.

mod config;
mod control;
mod sync;
mod value;

// Re-export all models
pub use config::{
    default_true, LogConfig, ParamsyncConfig, QueryConfig, SyncConfig, UrlLimits,
    RESERVED_URL_PARAMS,
};
pub use control::{ControlType, ControlValue, Record};
pub use sync::{
    ChangeSource, CompetingValue, ConflictPolicy, ConflictStatus, SyncConflict, SyncEvent,
    SyncGroup, SyncMode, SyncPhase, SyncRule, SyncState, SyncStatus, TransformDescriptor,
};
pub use value::{parse_date, DateRange, NumberRange, ParamValue};
