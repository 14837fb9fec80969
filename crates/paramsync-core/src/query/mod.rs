//! Query template engine.
//!
//! Templates are opaque SQL text with `${control[.path]}` references. They can
//! be rendered with escaped literals inlined ([`substitute`]) or with named
//! placeholders plus a binding map ([`parameterize`]). [`validate`] is a
//! separate, read-only pass; rendering never refuses a template.
//!
//! ```text
//! template ──parse──▶ references ──resolve(snapshot)──▶ literal | placeholder
//!                                                        │
//!                            validate ◀──────────────────┘──▶ QueryRunner ──▶ executor
//! ```

mod render;
mod runner;
mod validate;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests;

pub use render::{
    parameterize, parameterize_with_prefix, sql_literal, substitute, ParameterizedQuery,
    Substitution, DEFAULT_PLACEHOLDER_PREFIX,
};
pub use runner::{FnExecutor, QueryExecutor, QueryOutcome, QueryParams, QueryRunner, RenderMode};
pub use validate::{validate, validate_template, ValidationReport};
