//! Filter evaluation engine.
//!
//! The host maps controls to columns with [`FilterTarget`]s. Each evaluation
//! derives [`FilterPredicate`]s from the current control values (inactive
//! controls contribute nothing) and keeps the records that satisfy all of
//! them. A field that cannot be coerced drops only its own record.

mod engine;
mod predicate;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests;

pub use engine::{apply_filters, derive_predicates, filter_with_snapshot};
pub use predicate::{
    Condition, FilterKind, FilterPredicate, FilterTarget, NumberOp, TextOp, TopDirection,
};
