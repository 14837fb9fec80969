//! # paramsync Core
//!
//! Control-value propagation and query templating.
//!
//! ## Architecture
//!
//! ```text
//! paramsync-core/src/
//! ├── codec.rs       # value <-> URL-safe string
//! ├── params.rs      # ${control.path} reference parser
//! ├── store.rs       # authoritative control values, snapshots, change feed
//! ├── query/         # template rendering, validation, execution
//! ├── filter/        # predicate derivation and record filtering
//! ├── url_state.rs   # shareable URL state with safety limits
//! ├── sync/          # debounced group propagation and conflicts
//! └── modules/       # config, logging, group persistence
//! ```
//!
//! Everything reads control values through [`store::ControlSnapshot`]; only
//! [`store::ControlStore`] mutates them.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Coordinator state is updated under one lock per operation"
)]
#![allow(
    clippy::derive_partial_eq_without_eq,
    reason = "Values carry f64 and intentionally don't implement Eq"
)]
#![allow(clippy::needless_continue, reason = "Explicit continue improves loop readability")]
// Test-only lints: allow panic!, float comparisons, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::float_cmp,
        clippy::needless_collect,
        clippy::assertions_on_result_states
    )
)]

pub mod codec;
pub mod error;
pub mod filter;
pub mod modules;
pub mod params;
pub mod query;
pub mod store;
pub mod sync;
pub mod url_state;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use params::ParameterReference;
pub use query::{QueryExecutor, QueryRunner, ValidationReport};
pub use store::{ControlSnapshot, ControlStore, StoreChange};
pub use sync::SyncCoordinator;
