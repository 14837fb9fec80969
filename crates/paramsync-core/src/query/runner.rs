//! Render, validate and hand a template to the host's executor.

use async_trait::async_trait;
use futures::future::BoxFuture;
use paramsync_types::models::QueryConfig;
use paramsync_types::{ParamValue, QueryError, Record};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::query::render::{parameterize_with_prefix, substitute};
use crate::query::validate::{non_finite_bindings, validate, ValidationReport};
use crate::store::ControlSnapshot;

pub type QueryParams = BTreeMap<String, ParamValue>;

/// Host-supplied query execution. The database layer lives behind this.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// `params` is empty in literal mode.
    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<Vec<Record>, String>;
}

type ExecuteFn =
    dyn Fn(String, QueryParams) -> BoxFuture<'static, Result<Vec<Record>, String>> + Send + Sync;

/// Adapts a closure returning a boxed future into a [`QueryExecutor`].
pub struct FnExecutor {
    inner: Box<ExecuteFn>,
}

impl FnExecutor {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(String, QueryParams) -> BoxFuture<'static, Result<Vec<Record>, String>>
            + Send
            + Sync
            + 'static,
    {
        Self { inner: Box::new(f) }
    }
}

#[async_trait]
impl QueryExecutor for FnExecutor {
    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<Vec<Record>, String> {
        (self.inner)(sql.to_string(), params.clone()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    #[default]
    Literal,
    Parameterized,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub sql: String,
    pub params: QueryParams,
    pub records: Vec<Record>,
    pub report: ValidationReport,
    pub elapsed: Duration,
}

/// Runs templates against one executor. No retries.
pub struct QueryRunner {
    executor: Arc<dyn QueryExecutor>,
    config: QueryConfig,
}

impl QueryRunner {
    pub fn new(executor: Arc<dyn QueryExecutor>, config: QueryConfig) -> Self {
        Self { executor, config }
    }

    /// Render `template` against `snapshot` without executing it.
    pub fn render(
        &self,
        template: &str,
        snapshot: &ControlSnapshot,
        mode: RenderMode,
    ) -> (String, QueryParams, ValidationReport) {
        let (sql, params, references) = match mode {
            RenderMode::Literal => {
                let s = substitute(template, snapshot);
                (s.sql, QueryParams::new(), s.references)
            },
            RenderMode::Parameterized => {
                let p = parameterize_with_prefix(template, snapshot, &self.config.placeholder_prefix);
                (p.sql, p.params, p.references)
            },
        };

        let mut report = validate(&sql);
        report.parameter_count = references.len();
        report.errors.extend(non_finite_bindings(&references, snapshot));
        report.is_valid = report.errors.is_empty();
        (sql, params, report)
    }

    pub async fn run(
        &self,
        template: &str,
        snapshot: &ControlSnapshot,
        mode: RenderMode,
    ) -> Result<QueryOutcome, QueryError> {
        let (sql, params, report) = self.render(template, snapshot, mode);

        if !report.is_valid {
            tracing::warn!("[query] Invalid query: {}", report.errors.join("; "));
            if self.config.block_invalid {
                return Err(QueryError::Validation {
                    errors: report.errors,
                    warnings: report.warnings,
                });
            }
        }

        let start = Instant::now();
        let result = self.executor.execute(&sql, &params).await;
        let elapsed = start.elapsed();

        match result {
            Ok(records) => {
                tracing::debug!(
                    "[query] {} record(s) in {}ms",
                    records.len(),
                    elapsed.as_millis()
                );
                Ok(QueryOutcome { sql, params, records, report, elapsed })
            },
            Err(message) => {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                tracing::warn!("[query] Execution failed after {}ms: {}", elapsed_ms, message);
                Err(QueryError::Execution { message, elapsed_ms })
            },
        }
    }
}
