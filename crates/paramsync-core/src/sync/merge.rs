//! Merge combinators for the `merge` conflict policy.

use paramsync_types::{CompetingValue, NumberRange, ParamValue};
use std::sync::Arc;

/// Folds the competing writes of one conflict into a single value.
pub type MergeFn = Arc<dyn Fn(&[CompetingValue]) -> ParamValue + Send + Sync>;

/// Look up a built-in combinator by name: `union`, `widest`, `max`, `min`.
pub fn builtin(name: &str) -> Option<MergeFn> {
    let f: MergeFn = match name {
        "union" => Arc::new(union_lists),
        "widest" => Arc::new(widest_range),
        "max" => Arc::new(|values: &[CompetingValue]| extreme(values, f64::max)),
        "min" => Arc::new(|values: &[CompetingValue]| extreme(values, f64::min)),
        _ => return None,
    };
    Some(f)
}

/// Every list item from every write, first occurrence order.
pub fn union_lists(values: &[CompetingValue]) -> ParamValue {
    let mut merged: Vec<String> = Vec::new();
    for value in values {
        if let ParamValue::List(items) = &value.value {
            for item in items {
                if !merged.contains(item) {
                    merged.push(item.clone());
                }
            }
        }
    }
    ParamValue::List(merged)
}

/// Smallest lower bound and largest upper bound across numeric ranges.
/// A bound left open by any write stays open.
pub fn widest_range(values: &[CompetingValue]) -> ParamValue {
    let ranges: Vec<NumberRange> = values
        .iter()
        .filter_map(|v| match v.value {
            ParamValue::NumberRange(r) => Some(r),
            _ => None,
        })
        .collect();
    if ranges.is_empty() {
        return ParamValue::Null;
    }
    let min = ranges.iter().map(|r| r.min).reduce(|a, b| a.zip(b).map(|(a, b)| a.min(b))).flatten();
    let max = ranges.iter().map(|r| r.max).reduce(|a, b| a.zip(b).map(|(a, b)| a.max(b))).flatten();
    ParamValue::NumberRange(NumberRange::new(min, max))
}

fn extreme(values: &[CompetingValue], pick: fn(f64, f64) -> f64) -> ParamValue {
    values
        .iter()
        .filter_map(|v| match v.value {
            ParamValue::Number(n) => Some(n),
            _ => None,
        })
        .reduce(pick)
        .map_or(ParamValue::Null, ParamValue::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paramsync_types::ChangeSource;

    fn competing(value: ParamValue) -> CompetingValue {
        CompetingValue { control_id: "x".into(), value, timestamp: 0, source: ChangeSource::User }
    }

    #[test]
    fn test_union_keeps_first_seen_order() {
        let merged = union_lists(&[
            competing(ParamValue::List(vec!["b".into(), "a".into()])),
            competing(ParamValue::List(vec!["a".into(), "c".into()])),
        ]);
        assert_eq!(merged, ParamValue::List(vec!["b".into(), "a".into(), "c".into()]));
    }

    #[test]
    fn test_widest_range_keeps_open_bounds() {
        let merged = widest_range(&[
            competing(ParamValue::NumberRange(NumberRange::new(Some(10.0), Some(20.0)))),
            competing(ParamValue::NumberRange(NumberRange::new(Some(5.0), None))),
        ]);
        assert_eq!(merged, ParamValue::NumberRange(NumberRange::new(Some(5.0), None)));

        let merged = widest_range(&[
            competing(ParamValue::NumberRange(NumberRange::new(None, Some(20.0)))),
            competing(ParamValue::NumberRange(NumberRange::new(Some(5.0), Some(30.0)))),
        ]);
        assert_eq!(merged, ParamValue::NumberRange(NumberRange::new(None, Some(30.0))));

        let merged = widest_range(&[
            competing(ParamValue::NumberRange(NumberRange::new(Some(10.0), Some(20.0)))),
            competing(ParamValue::NumberRange(NumberRange::new(Some(5.0), Some(15.0)))),
        ]);
        assert_eq!(merged, ParamValue::NumberRange(NumberRange::new(Some(5.0), Some(20.0))));
    }

    #[test]
    fn test_builtin_lookup() {
        let max = builtin("max").map(|f| f(&[competing(ParamValue::Number(2.0)), competing(ParamValue::Number(7.0))]));
        assert_eq!(max, Some(ParamValue::Number(7.0)));
        assert!(builtin("eval").is_none());
    }
}
