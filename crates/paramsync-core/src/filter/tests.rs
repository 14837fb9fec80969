use super::*;
use crate::store::ControlSnapshot;
use chrono::NaiveDate;
use paramsync_types::{ControlType, ControlValue, DateRange, NumberRange, ParamValue, Record};
use serde_json::json;

fn record(value: serde_json::Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn sales() -> Vec<Record> {
    vec![
        record(json!({"id": 1, "region": "US", "amount": 120, "active": true, "day": "2024-01-01"})),
        record(json!({"id": 2, "region": "EU", "amount": 40, "active": false, "day": "2024-01-15"})),
        record(json!({"id": 3, "region": "us", "amount": "75", "active": 1, "day": "2024-01-31T23:30:00"})),
        record(json!({"id": 4, "region": "APAC", "amount": "n/a", "active": "yes", "day": "2024-02-01"})),
        record(json!({"id": 5, "region": "EU", "amount": 300, "active": true, "day": "not a date"})),
    ]
}

fn ids(records: &[Record]) -> Vec<i64> {
    records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
}

fn predicate(column: &str, condition: Condition) -> FilterPredicate {
    FilterPredicate {
        control_id: format!("ctl_{}", column),
        control_type: ControlType::Text,
        column: column.to_string(),
        condition,
    }
}

fn text(op: TextOp, needle: &str, case_sensitive: bool) -> Condition {
    Condition::Text { op, needle: needle.to_string(), case_sensitive }
}

#[test]
fn test_text_operators() {
    let data = sales();
    let run = |op, needle, cs| ids(&apply_filters(&data, &[predicate("region", text(op, needle, cs))]));

    assert_eq!(run(TextOp::EqualTo, "US", true), vec![1]);
    assert_eq!(run(TextOp::EqualTo, "US", false), vec![1, 3]);
    assert_eq!(run(TextOp::NotEqualTo, "eu", false), vec![1, 3, 4]);
    assert_eq!(run(TextOp::Contains, "A", true), vec![4]);
    assert_eq!(run(TextOp::DoesNotContain, "u", false), vec![4]);
    assert_eq!(run(TextOp::StartsWith, "ap", false), vec![4]);
    assert_eq!(run(TextOp::DoesNotStartWith, "E", true), vec![1, 3, 4]);
    assert_eq!(run(TextOp::EndsWith, "S", true), vec![1]);
    assert_eq!(run(TextOp::DoesNotEndWith, "s", false), vec![2, 4, 5]);
    assert_eq!(run(TextOp::MatchesRegexp, "^(us|eu)$", false), vec![1, 2, 3, 5]);
    assert_eq!(run(TextOp::DoesNotMatchRegexp, "^E", true), vec![1, 3, 4]);
}

#[test]
fn test_malformed_regex_never_matches() {
    let data = sales();
    let matches = apply_filters(&data, &[predicate("region", text(TextOp::MatchesRegexp, "(", true))]);
    assert!(matches.is_empty());

    let inverse =
        apply_filters(&data, &[predicate("region", text(TextOp::DoesNotMatchRegexp, "(", true))]);
    assert_eq!(ids(&inverse), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_number_coercion_failure_drops_only_that_record() {
    let data = sales();
    let kept = apply_filters(
        &data,
        &[predicate("amount", Condition::Number { op: NumberOp::GreaterThanOrEqual, value: 50.0 })],
    );
    assert_eq!(ids(&kept), vec![1, 3, 5]);

    let le = apply_filters(
        &data,
        &[predicate("amount", Condition::Number { op: NumberOp::LessThanOrEqual, value: 75.0 })],
    );
    assert_eq!(ids(&le), vec![2, 3]);
}

#[test]
fn test_boolean_equality_after_coercion() {
    let kept = apply_filters(&sales(), &[predicate("active", Condition::Boolean(true))]);
    assert_eq!(ids(&kept), vec![1, 3, 4, 5]);
}

#[test]
fn test_list_membership() {
    let data = vec![
        record(json!({"id": 1, "tag": "a"})),
        record(json!({"id": 2, "tag": ["x", "b"]})),
        record(json!({"id": 3, "tag": "c"})),
        record(json!({"id": 4})),
    ];
    let kept = apply_filters(
        &data,
        &[predicate("tag", Condition::Membership(vec!["a".into(), "b".into()]))],
    );
    assert_eq!(ids(&kept), vec![1, 2]);
}

#[test]
fn test_open_ended_ranges() {
    let data = sales();
    let at_least = apply_filters(
        &data,
        &[predicate("amount", Condition::NumberBetween { min: Some(75.0), max: None })],
    );
    assert_eq!(ids(&at_least), vec![1, 3, 5]);

    let between = apply_filters(
        &data,
        &[predicate("amount", Condition::NumberBetween { min: Some(40.0), max: Some(120.0) })],
    );
    assert_eq!(ids(&between), vec![1, 2, 3]);
}

#[test]
fn test_date_range_end_is_inclusive_through_end_of_day() {
    let jan = |d| NaiveDate::from_ymd_opt(2024, 1, d);
    let kept = apply_filters(
        &sales(),
        &[predicate("day", Condition::DateBetween { start: jan(1), end: jan(31) })],
    );
    assert_eq!(ids(&kept), vec![1, 2, 3]);

    let from_mid = apply_filters(
        &sales(),
        &[predicate("day", Condition::DateBetween { start: jan(15), end: None })],
    );
    assert_eq!(ids(&from_mid), vec![2, 3, 4]);
}

#[test]
fn test_top_n_count_and_percentile() {
    let data = sales();
    let top2 = apply_filters(
        &data,
        &[predicate(
            "amount",
            Condition::TopN { n: 2.0, direction: TopDirection::Top, percentile: false },
        )],
    );
    // Survivors keep their input order.
    assert_eq!(ids(&top2), vec![1, 5]);

    let bottom = apply_filters(
        &data,
        &[predicate(
            "amount",
            Condition::TopN { n: 1.0, direction: TopDirection::Bottom, percentile: false },
        )],
    );
    assert_eq!(ids(&bottom), vec![2]);

    // ceil(50% of 5) = 3
    let pct = apply_filters(
        &data,
        &[predicate(
            "amount",
            Condition::TopN { n: 50.0, direction: TopDirection::Top, percentile: true },
        )],
    );
    assert_eq!(ids(&pct), vec![1, 3, 5]);
}

#[test]
fn test_top_n_ranks_non_numeric_rows_last() {
    let data = sales();
    let four = apply_filters(
        &data,
        &[predicate(
            "amount",
            Condition::TopN { n: 4.0, direction: TopDirection::Bottom, percentile: false },
        )],
    );
    assert_eq!(ids(&four), vec![1, 2, 3, 5]);
}

#[test]
fn test_top_n_runs_after_row_predicates() {
    let data = sales();
    let kept = apply_filters(
        &data,
        &[
            predicate("amount", Condition::TopN { n: 1.0, direction: TopDirection::Top, percentile: false }),
            predicate("region", text(TextOp::EqualTo, "us", false)),
        ],
    );
    assert_eq!(ids(&kept), vec![1]);
}

#[test]
fn test_legend_hides_series() {
    let data = sales();
    let hidden = apply_filters(
        &data,
        &[predicate("region", Condition::Hidden { hidden: vec!["EU".into()], series: vec![] })],
    );
    assert_eq!(ids(&hidden), vec![1, 3, 4]);

    let everything = apply_filters(
        &data,
        &[predicate(
            "region",
            Condition::Hidden {
                hidden: vec!["US".into(), "EU".into()],
                series: vec!["US".into(), "EU".into()],
            },
        )],
    );
    assert!(everything.is_empty());
}

#[test]
fn test_inactive_controls_do_not_filter() {
    let snapshot = ControlSnapshot::from_controls([
        ControlValue::new("region", ControlType::Text, ParamValue::Text(String::new())),
        ControlValue::new("amount", ControlType::NumberRange, ParamValue::NumberRange(NumberRange::default())),
        ControlValue::new("tags", ControlType::List, ParamValue::List(vec![])),
    ]);
    let targets = vec![
        FilterTarget::new("region", "region", FilterKind::Text { op: TextOp::EqualTo, case_sensitive: false }),
        FilterTarget::new("amount", "amount", FilterKind::NumberRange),
        FilterTarget::new("tags", "region", FilterKind::ListMembership),
        FilterTarget::new("missing", "region", FilterKind::Boolean),
    ];
    assert!(derive_predicates(&targets, &snapshot).is_empty());
    assert_eq!(filter_with_snapshot(&sales(), &targets, &snapshot).len(), 5);
}

#[test]
fn test_filter_with_snapshot_derives_each_kind() {
    let snapshot = ControlSnapshot::from_controls([
        ControlValue::new("minAmount", ControlType::Number, ParamValue::Number(50.0)),
        ControlValue::new(
            "period",
            ControlType::DateRange,
            ParamValue::DateRange(DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 1), None)),
        ),
        ControlValue::new("regions", ControlType::List, ParamValue::List(vec!["US".into(), "EU".into()])),
    ]);
    let targets = vec![
        FilterTarget::new("minAmount", "amount", FilterKind::Slider),
        FilterTarget::new("period", "day", FilterKind::DateRange),
        FilterTarget::new("regions", "region", FilterKind::ListMembership),
    ];
    let kept = filter_with_snapshot(&sales(), &targets, &snapshot);
    assert_eq!(ids(&kept), vec![1]);
}

#[test]
fn test_target_deserializes_flat() {
    let target: FilterTarget = serde_json::from_value(json!({
        "control_id": "q",
        "column": "name",
        "kind": "text",
        "op": "starts_with"
    }))
    .unwrap();
    assert_eq!(target.kind, FilterKind::Text { op: TextOp::StartsWith, case_sensitive: false });

    let top: FilterTarget = serde_json::from_value(json!({
        "control_id": "n", "column": "amount", "kind": "top_n", "percentile": true
    }))
    .unwrap();
    assert_eq!(top.kind, FilterKind::TopN { direction: TopDirection::Top, percentile: true });
}
