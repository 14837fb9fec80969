use super::*;
use crate::error::SyncError;
use crate::models::value::{DateRange, NumberRange, ParamValue};
use chrono::NaiveDate;

fn competing(control_id: &str, value: f64, timestamp: i64) -> CompetingValue {
    CompetingValue {
        control_id: control_id.to_string(),
        value: ParamValue::Number(value),
        timestamp,
        source: ChangeSource::User,
    }
}

#[test]
fn test_group_requires_two_members() {
    let group = SyncGroup::new("solo", ["a"], SyncMode::Bidirectional);
    assert!(matches!(group.validate(), Err(SyncError::InvalidGroup { .. })));

    let group = SyncGroup::new("pair", ["a", "b"], SyncMode::Bidirectional);
    assert!(group.validate().is_ok());
}

#[test]
fn test_group_rejects_duplicate_members() {
    let group = SyncGroup::new("dup", ["a", "b", "a"], SyncMode::Broadcast);
    assert!(group.validate().is_err());
}

#[test]
fn test_master_required_in_master_slave_and_must_be_member() {
    let missing = SyncGroup::new("ms", ["a", "b"], SyncMode::MasterSlave);
    assert!(missing.validate().is_err());

    let outsider = SyncGroup::new("ms", ["a", "b"], SyncMode::MasterSlave).with_master("z");
    assert!(outsider.validate().is_err());

    let ok = SyncGroup::new("ms", ["a", "b"], SyncMode::MasterSlave).with_master("a");
    assert!(ok.validate().is_ok());

    let bidirectional = SyncGroup::new("bi", ["a", "b"], SyncMode::Bidirectional).with_master("a");
    assert!(bidirectional.validate().is_ok());

    let broadcast_outsider = SyncGroup::new("bc", ["a", "b"], SyncMode::Broadcast).with_master("z");
    assert!(broadcast_outsider.validate().is_err());
}

#[test]
fn test_master_wins_needs_master() {
    let group = SyncGroup::new("bi", ["a", "b"], SyncMode::Bidirectional)
        .with_policy(ConflictPolicy::MasterWins);
    assert!(group.validate().is_err());

    let group = SyncGroup::new("bi", ["a", "b"], SyncMode::Bidirectional)
        .with_master("b")
        .with_policy(ConflictPolicy::MasterWins);
    assert!(group.validate().is_ok());
}

#[test]
fn test_others_preserves_order() {
    let group = SyncGroup::new("g", ["a", "b", "c"], SyncMode::Broadcast);
    let others: Vec<&String> = group.others("b").collect();
    assert_eq!(others, vec!["a", "c"]);
}

#[test]
fn test_group_deserializes_with_defaults() {
    let group: SyncGroup =
        serde_json::from_str(r#"{"id":"g1","name":"dates","members":["x","y"]}"#).unwrap();
    assert!(group.enabled);
    assert_eq!(group.mode, SyncMode::Bidirectional);
    assert_eq!(group.conflict_policy, ConflictPolicy::LatestWins);
}

#[test]
fn test_conflict_latest_prefers_later_arrival_on_tie() {
    let conflict = SyncConflict::new(
        "g",
        "b",
        vec![competing("a", 1.0, 100), competing("b", 2.0, 100)],
    );
    assert_eq!(conflict.latest().unwrap().control_id, "b");

    let conflict = SyncConflict::new(
        "g",
        "b",
        vec![competing("a", 1.0, 300), competing("b", 2.0, 100)],
    );
    assert_eq!(conflict.latest().unwrap().control_id, "a");
}

#[test]
fn test_conflict_terminal_transitions_are_idempotent() {
    let mut conflict = SyncConflict::new("g", "a", vec![competing("a", 1.0, 1)]);
    assert!(conflict.resolve(ParamValue::Number(1.0), "alice"));
    assert!(!conflict.resolve(ParamValue::Number(9.0), "bob"));
    assert!(!conflict.ignore());
    assert_eq!(conflict.status, ConflictStatus::Resolved);
    assert_eq!(conflict.resolved_value, Some(ParamValue::Number(1.0)));
    assert_eq!(conflict.resolved_by.as_deref(), Some("alice"));
}

#[test]
fn test_transform_numeric() {
    let scale = TransformDescriptor::Scale { factor: 2.0 };
    assert_eq!(scale.apply(&ParamValue::Number(21.0)), Some(ParamValue::Number(42.0)));

    let clamp = TransformDescriptor::Clamp { min: Some(0.0), max: Some(10.0) };
    assert_eq!(
        clamp.apply(&ParamValue::NumberRange(NumberRange::new(Some(-5.0), Some(50.0)))),
        Some(ParamValue::NumberRange(NumberRange::new(Some(0.0), Some(10.0))))
    );

    let round = TransformDescriptor::Round { decimals: 1 };
    assert_eq!(round.apply(&ParamValue::Number(3.14159)), Some(ParamValue::Number(3.1)));

    assert_eq!(scale.apply(&ParamValue::Text("x".into())), None);
}

#[test]
fn test_transform_text_and_ranges() {
    let upper = TransformDescriptor::Uppercase;
    assert_eq!(
        upper.apply(&ParamValue::List(vec!["us".into(), "eu".into()])),
        Some(ParamValue::List(vec!["US".into(), "EU".into()]))
    );

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let to_range = TransformDescriptor::ToRange { width: 6.0 };
    assert_eq!(
        to_range.apply(&ParamValue::Date(start)),
        Some(ParamValue::DateRange(DateRange::new(
            Some(start),
            NaiveDate::from_ymd_opt(2024, 1, 7)
        )))
    );

    let lower_bound = TransformDescriptor::RangeMin;
    assert_eq!(
        lower_bound.apply(&ParamValue::NumberRange(NumberRange::new(Some(10.0), Some(50.0)))),
        Some(ParamValue::Number(10.0))
    );
}

#[test]
fn test_transform_passes_null_through() {
    let scale = TransformDescriptor::Scale { factor: 3.0 };
    assert_eq!(scale.apply(&ParamValue::Null), Some(ParamValue::Null));
}

#[test]
fn test_transform_serialization_is_tagged() {
    let json = serde_json::to_value(TransformDescriptor::Offset { amount: 1.5 }).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "offset", "amount": 1.5}));
}

#[test]
fn test_event_skipped_carries_reason() {
    let event = SyncEvent::skipped(
        "g",
        "slave",
        "master",
        ParamValue::Null,
        ParamValue::Number(1.0),
        "slave changes are not propagated",
    );
    assert!(!event.propagated);
    assert_eq!(event.source, ChangeSource::Sync);
    assert!(event.reason.is_some());
}
