use super::*;
use crate::store::ControlSnapshot;
use chrono::NaiveDate;
use futures::FutureExt;
use paramsync_types::models::QueryConfig;
use paramsync_types::{ControlType, ControlValue, NumberRange, ParamValue, QueryError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn snapshot(controls: Vec<(&str, ControlType, ParamValue)>) -> ControlSnapshot {
    ControlSnapshot::from_controls(
        controls.into_iter().map(|(id, ty, value)| ControlValue::new(id, ty, value)),
    )
}

fn orders_snapshot() -> ControlSnapshot {
    snapshot(vec![
        ("region", ControlType::Text, ParamValue::Text("US".into())),
        ("minTotal", ControlType::Number, ParamValue::Number(100.0)),
    ])
}

#[test]
fn test_substitutes_orders_scenario() {
    let result = substitute(
        "SELECT id FROM orders WHERE region = ${region} AND total >= ${minTotal}",
        &orders_snapshot(),
    );
    assert_eq!(result.sql, "SELECT id FROM orders WHERE region = 'US' AND total >= 100");
    assert!(result.unresolved.is_empty());
}

#[test]
fn test_substitutes_range_bounds_independently() {
    let snap = snapshot(vec![(
        "amount",
        ControlType::NumberRange,
        ParamValue::NumberRange(NumberRange::new(Some(10.0), Some(50.0))),
    )]);
    let result =
        substitute("SELECT id FROM t WHERE amount BETWEEN ${amount.min} AND ${amount.max}", &snap);
    assert_eq!(result.sql, "SELECT id FROM t WHERE amount BETWEEN 10 AND 50");
}

#[test]
fn test_substitution_is_offset_safe() {
    let snap = snapshot(vec![
        ("a", ControlType::Number, ParamValue::Number(1.0)),
        ("bb", ControlType::Date, ParamValue::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())),
    ]);
    let result = substitute("SELECT * FROM t WHERE a=${a} AND b=${bb}", &snap);
    assert_eq!(result.sql, "SELECT * FROM t WHERE a=1 AND b='2024-01-01'");
}

#[test]
fn test_literal_rendering_rules() {
    let snap = snapshot(vec![
        ("name", ControlType::Text, ParamValue::Text("O'Brien".into())),
        ("flag", ControlType::Boolean, ParamValue::Boolean(false)),
        ("tags", ControlType::List, ParamValue::List(vec!["a".into(), "1".into()])),
        ("none", ControlType::List, ParamValue::List(vec![])),
    ]);
    let result = substitute("${name} ${flag} ${tags} ${none}", &snap);
    assert_eq!(result.sql, "'O''Brien' 0 ('a', '1') (NULL)");
}

#[test]
fn test_unknown_references_become_null_and_are_reported() {
    let snap = snapshot(vec![(
        "amount",
        ControlType::NumberRange,
        ParamValue::NumberRange(NumberRange::new(Some(1.0), None)),
    )]);
    let result = substitute("${ghost} ${amount} ${amount.max} ${amount.bogus}", &snap);
    assert_eq!(result.sql, "NULL NULL NULL NULL");
    // An open bound is a known path with no value, not an unresolved reference.
    assert_eq!(result.unresolved, vec!["ghost", "amount", "amount.bogus"]);
}

#[test]
fn test_text_injection_is_escaped() {
    let snap = snapshot(vec![("q", ControlType::Text, ParamValue::Text("x'; DROP TABLE t; --".into()))]);
    let result = substitute("SELECT id FROM t WHERE name = ${q}", &snap);
    assert_eq!(result.sql, "SELECT id FROM t WHERE name = 'x''; DROP TABLE t; --'");
    // The payload sits inside a literal, so only the quote idiom is flagged.
    let report = validate(&result.sql);
    assert!(report.errors.iter().all(|e| !e.contains("Comment")));
}

#[test]
fn test_parameterize_reuses_placeholders() {
    let snap = snapshot(vec![
        ("region", ControlType::Text, ParamValue::Text("US".into())),
        (
            "amount",
            ControlType::NumberRange,
            ParamValue::NumberRange(NumberRange::new(Some(10.0), Some(50.0))),
        ),
    ]);
    let query = parameterize(
        "SELECT id FROM t WHERE r = ${region} OR s = ${region} AND a >= ${amount.min}",
        &snap,
    );
    assert_eq!(query.sql, "SELECT id FROM t WHERE r = :p_region OR s = :p_region AND a >= :p_amount_min");
    assert_eq!(query.params.len(), 2);
    assert_eq!(query.params["p_region"], ParamValue::Text("US".into()));
    assert_eq!(query.params["p_amount_min"], ParamValue::Number(10.0));
    assert!(!query.sql.contains("'US'"));
}

#[test]
fn test_parameterize_disambiguates_sanitized_collisions() {
    let snap = snapshot(vec![
        ("a-b", ControlType::Number, ParamValue::Number(1.0)),
        ("a_b", ControlType::Number, ParamValue::Number(2.0)),
    ]);
    let query = parameterize_with_prefix("${a-b} ${a_b}", &snap, "q");
    assert_eq!(query.sql, ":q_a_b :q_a_b_2");
    assert_eq!(query.params["q_a_b_2"], ParamValue::Number(2.0));
}

#[test]
fn test_validate_rejects_stacked_drop() {
    let report = validate("SELECT * FROM t; DROP TABLE t");
    assert!(!report.is_valid);
    assert!(report.errors.iter().any(|e| e.contains("DROP")));
}

#[test]
fn test_validate_accepts_plain_select() {
    let report = validate("SELECT id FROM t WHERE x = 1");
    assert!(report.is_valid, "{:?}", report.errors);
    assert!(report.warnings.iter().all(|w| !w.contains("SELECT *")));
    assert!(report.warnings.iter().any(|w| w.contains("row-limiting")));

    let limited = validate("SELECT id FROM t WHERE x = 1 LIMIT 10");
    assert!(limited.warnings.is_empty());
}

#[test]
fn test_validate_structural_errors() {
    assert!(!validate("DELETE FROM t").is_valid);
    assert!(!validate("SELECT 1").is_valid);
    assert!(!validate("SELECT id FROM t WHERE (a = 1").is_valid);
    assert!(!validate("SELECT id FROM t UNION SELECT pw FROM users").is_valid);
    assert!(!validate("SELECT id FROM t -- trailing").is_valid);
    assert!(!validate("SELECT id FROM t /* x */").is_valid);
    assert!(!validate("SELECT id FROM t WHERE a = 'x' OR '1'='1'").is_valid);
    assert!(!validate("SELECT id FROM t WHERE a = 'x' OR 1=1").is_valid);
    assert!(!validate("SELECT id FROM t WHERE a = 'open").is_valid);
    assert!(!validate("   ").is_valid);
}

#[test]
fn test_validate_ignores_markers_inside_literals() {
    let report = validate("SELECT id FROM t WHERE note = 'a (b -- c # d' LIMIT 5");
    assert!(report.is_valid, "{:?}", report.errors);
}

#[test]
fn test_validate_counts_references() {
    let report = validate("SELECT id FROM t WHERE a = ${a} AND b = ${b.min}");
    assert_eq!(report.parameter_count, 2);
}

#[test]
fn test_validate_template_flags_non_finite_numbers() {
    let snap = snapshot(vec![("n", ControlType::Number, ParamValue::Number(f64::NAN))]);
    let report = validate_template("SELECT id FROM t WHERE n = ${n} LIMIT 1", &snap);
    assert!(!report.is_valid);
    assert_eq!(report.parameter_count, 1);
    assert!(report.errors.iter().any(|e| e.contains("non-finite")));
}

fn counting_executor(calls: Arc<AtomicUsize>, fail: bool) -> Arc<dyn QueryExecutor> {
    Arc::new(FnExecutor::new(move |sql, _params| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if fail {
                Err("connection refused".to_string())
            } else {
                let mut record = paramsync_types::Record::new();
                record.insert("sql".into(), serde_json::Value::String(sql));
                Ok(vec![record])
            }
        }
        .boxed()
    }))
}

#[tokio::test]
async fn test_runner_executes_valid_query() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runner = QueryRunner::new(counting_executor(calls.clone(), false), QueryConfig::default());

    let outcome = runner
        .run(
            "SELECT id FROM orders WHERE region = ${region} LIMIT 5",
            &orders_snapshot(),
            RenderMode::Parameterized,
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.sql, "SELECT id FROM orders WHERE region = :p_region LIMIT 5");
    assert_eq!(outcome.params["p_region"], ParamValue::Text("US".into()));
    assert_eq!(outcome.records.len(), 1);
}

#[tokio::test]
async fn test_runner_blocks_invalid_query() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runner = QueryRunner::new(counting_executor(calls.clone(), false), QueryConfig::default());

    let err = runner
        .run("SELECT * FROM t; DROP TABLE t", &orders_snapshot(), RenderMode::Literal)
        .await
        .unwrap_err();

    assert!(matches!(err, QueryError::Validation { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_runner_passes_invalid_query_when_not_blocking() {
    let calls = Arc::new(AtomicUsize::new(0));
    let config = QueryConfig { block_invalid: false, ..QueryConfig::default() };
    let runner = QueryRunner::new(counting_executor(calls.clone(), false), config);

    let outcome =
        runner.run("SELECT id FROM t -- note", &orders_snapshot(), RenderMode::Literal).await.unwrap();
    assert!(!outcome.report.is_valid);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_runner_surfaces_execution_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let runner = QueryRunner::new(counting_executor(calls.clone(), true), QueryConfig::default());

    let err = runner
        .run("SELECT id FROM t LIMIT 1", &orders_snapshot(), RenderMode::Literal)
        .await
        .unwrap_err();

    match err {
        QueryError::Execution { message, .. } => assert_eq!(message, "connection refused"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
