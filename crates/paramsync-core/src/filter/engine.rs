//! Predicate evaluation over record sequences.

use chrono::{DateTime, NaiveDate};
use paramsync_types::models::parse_date;
use paramsync_types::Record;
use regex::{Regex, RegexBuilder};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

use super::predicate::{Condition, FilterPredicate, FilterTarget, NumberOp, TextOp, TopDirection};
use crate::store::ControlSnapshot;

/// A predicate with its per-evaluation state (compiled regex, folded needle).
struct Prepared<'a> {
    predicate: &'a FilterPredicate,
    needle: Option<String>,
    regex: Option<Regex>,
}

impl<'a> Prepared<'a> {
    fn new(predicate: &'a FilterPredicate) -> Self {
        let (needle, regex) = match &predicate.condition {
            Condition::Text { op, needle, case_sensitive } if op.is_regex() => {
                let regex = RegexBuilder::new(needle).case_insensitive(!case_sensitive).build();
                if let Err(e) = &regex {
                    tracing::debug!("[filter] Invalid pattern for {}: {}", predicate.control_id, e);
                }
                (None, regex.ok())
            },
            Condition::Text { needle, case_sensitive: false, .. } => (Some(needle.to_lowercase()), None),
            Condition::Text { needle, .. } => (Some(needle.clone()), None),
            _ => (None, None),
        };
        Self { predicate, needle, regex }
    }

    /// Whether `record` passes. A field that cannot be coerced fails.
    fn matches(&self, record: &Record) -> bool {
        let field = record.get(&self.predicate.column);

        match &self.predicate.condition {
            Condition::Text { op, case_sensitive, .. } => {
                let Some(text) = field.and_then(field_text) else {
                    return false;
                };
                if op.is_regex() {
                    // A malformed pattern never matches.
                    let hit = self.regex.as_ref().is_some_and(|re| re.is_match(&text));
                    return if *op == TextOp::MatchesRegexp { hit } else { !hit };
                }
                let text = if *case_sensitive { text } else { text.to_lowercase() };
                let needle = self.needle.as_deref().unwrap_or_default();
                match op {
                    TextOp::EqualTo => text == needle,
                    TextOp::NotEqualTo => text != needle,
                    TextOp::Contains => text.contains(needle),
                    TextOp::DoesNotContain => !text.contains(needle),
                    TextOp::StartsWith => text.starts_with(needle),
                    TextOp::DoesNotStartWith => !text.starts_with(needle),
                    TextOp::EndsWith => text.ends_with(needle),
                    TextOp::DoesNotEndWith => !text.ends_with(needle),
                    TextOp::MatchesRegexp | TextOp::DoesNotMatchRegexp => false,
                }
            },
            Condition::Number { op, value } => match field.and_then(field_number) {
                Some(n) => match op {
                    NumberOp::EqualTo => n == *value,
                    NumberOp::LessThanOrEqual => n <= *value,
                    NumberOp::GreaterThanOrEqual => n >= *value,
                },
                None => false,
            },
            Condition::Boolean(expected) => field.and_then(field_bool) == Some(*expected),
            Condition::Membership(selected) => match field {
                Some(JsonValue::Array(items)) => {
                    items.iter().filter_map(field_text).any(|t| selected.contains(&t))
                },
                Some(other) => field_text(other).is_some_and(|t| selected.contains(&t)),
                None => false,
            },
            Condition::NumberBetween { min, max } => field.and_then(field_number).is_some_and(|n| {
                min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi)
            }),
            // Day granularity makes the end bound inclusive through end of day.
            Condition::DateBetween { start, end } => field.and_then(field_date).is_some_and(|d| {
                start.is_none_or(|lo| d >= lo) && end.is_none_or(|hi| d <= hi)
            }),
            Condition::Hidden { hidden, .. } => match field.and_then(field_text) {
                Some(key) => !hidden.contains(&key),
                None => true,
            },
            Condition::TopN { .. } => true,
        }
    }
}

fn field_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn field_number(value: &JsonValue) -> Option<f64> {
    let n = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn field_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Calendar day of a field: `YYYY-MM-DD`, a date-time string, or epoch millis.
fn field_date(value: &JsonValue) -> Option<NaiveDate> {
    match value {
        JsonValue::String(s) => parse_date(s),
        JsonValue::Number(n) => {
            DateTime::from_timestamp_millis(n.as_i64()?).map(|dt| dt.date_naive())
        },
        _ => None,
    }
}

/// Keep the rows ranked within the first N (or N percent) by `column`.
///
/// Ranking is a stable sort, so ties keep their input order; rows whose
/// column cannot be read as a number rank last. Survivors are returned in
/// their input order.
fn top_n(
    records: Vec<Record>,
    column: &str,
    n: f64,
    direction: TopDirection,
    percentile: bool,
) -> Vec<Record> {
    let keep = if percentile {
        let pct = n.clamp(0.0, 100.0);
        (pct / 100.0 * records.len() as f64).ceil() as usize
    } else {
        n.max(0.0).floor() as usize
    };
    if keep >= records.len() {
        return records;
    }

    let mut ranked: Vec<(usize, Option<f64>)> = records
        .iter()
        .enumerate()
        .map(|(i, r)| (i, r.get(column).and_then(field_number)))
        .collect();
    ranked.sort_by(|(_, a), (_, b)| match (a, b) {
        (Some(a), Some(b)) => match direction {
            TopDirection::Top => b.partial_cmp(a).unwrap_or(Ordering::Equal),
            TopDirection::Bottom => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut selected = vec![false; records.len()];
    for (i, _) in ranked.into_iter().take(keep) {
        selected[i] = true;
    }
    records.into_iter().zip(selected).filter_map(|(r, keep)| keep.then_some(r)).collect()
}

/// Records satisfying every predicate, in their original relative order.
///
/// Row predicates run first; top-N predicates then rank the survivors in
/// declaration order.
pub fn apply_filters(records: &[Record], predicates: &[FilterPredicate]) -> Vec<Record> {
    // A legend whose every declared series is hidden leaves nothing visible.
    let all_hidden = predicates.iter().any(|p| match &p.condition {
        Condition::Hidden { hidden, series } => {
            !series.is_empty() && series.iter().all(|s| hidden.contains(s))
        },
        _ => false,
    });
    if all_hidden {
        return Vec::new();
    }

    let rows: Vec<Prepared<'_>> =
        predicates.iter().filter(|p| !p.is_ranking()).map(Prepared::new).collect();

    let mut result: Vec<Record> = records
        .iter()
        .filter(|record| rows.iter().all(|p| p.matches(record)))
        .cloned()
        .collect();

    for predicate in predicates.iter().filter(|p| p.is_ranking()) {
        if let Condition::TopN { n, direction, percentile } = predicate.condition {
            result = top_n(result, &predicate.column, n, direction, percentile);
        }
    }

    tracing::debug!(
        "[filter] {} of {} record(s) kept by {} predicate(s)",
        result.len(),
        records.len(),
        predicates.len()
    );
    result
}

/// Derive the active predicates for `targets` from `snapshot`.
pub fn derive_predicates(targets: &[FilterTarget], snapshot: &ControlSnapshot) -> Vec<FilterPredicate> {
    targets
        .iter()
        .filter_map(|target| match snapshot.get(&target.control_id) {
            Some(control) => FilterPredicate::derive(target, control),
            None => {
                tracing::debug!("[filter] Target references unknown control {}", target.control_id);
                None
            },
        })
        .collect()
}

/// Filter `records` by every target whose control is currently active.
pub fn filter_with_snapshot(
    records: &[Record],
    targets: &[FilterTarget],
    snapshot: &ControlSnapshot,
) -> Vec<Record> {
    apply_filters(records, &derive_predicates(targets, snapshot))
}
