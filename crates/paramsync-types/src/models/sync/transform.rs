//! Declarative value transforms applied on the way to a target control.
//!
//! Transforms are a closed set of named built-ins with parameters. There is
//! no way to supply code; anything not listed here is not a transform.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::models::value::{DateRange, NumberRange, ParamValue};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformDescriptor {
    #[default]
    Identity,
    /// Multiply numbers (and both range bounds)
    Scale { factor: f64 },
    /// Add to numbers (and both range bounds)
    Offset { amount: f64 },
    /// Clamp numbers (and both range bounds)
    Clamp {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    /// Round numbers to a number of decimals
    Round { decimals: u32 },
    /// Prepend to text (and to every list item)
    Prefix { value: String },
    /// Append to text (and to every list item)
    Suffix { value: String },
    Uppercase,
    Lowercase,
    /// Lower bound of a range as a scalar
    RangeMin,
    /// Upper bound of a range as a scalar
    RangeMax,
    /// Scalar to a range starting at the value; dates widen by whole days
    ToRange { width: f64 },
}

impl TransformDescriptor {
    /// Apply to a value. `None` means the transform does not apply to this
    /// variant; a cleared value (`Null`) always passes through.
    pub fn apply(&self, value: &ParamValue) -> Option<ParamValue> {
        if value.is_null() {
            return Some(ParamValue::Null);
        }
        match self {
            Self::Identity => Some(value.clone()),
            Self::Scale { factor } => map_numeric(value, |n| n * factor),
            Self::Offset { amount } => map_numeric(value, |n| n + amount),
            Self::Clamp { min, max } => map_numeric(value, |n| {
                let n = min.map_or(n, |lo| n.max(lo));
                max.map_or(n, |hi| n.min(hi))
            }),
            Self::Round { decimals } => {
                let factor = 10f64.powi(i32::try_from(*decimals).unwrap_or(i32::MAX).min(15));
                map_numeric(value, |n| (n * factor).round() / factor)
            },
            Self::Prefix { value: prefix } => map_text(value, |s| format!("{}{}", prefix, s)),
            Self::Suffix { value: suffix } => map_text(value, |s| format!("{}{}", s, suffix)),
            Self::Uppercase => map_text(value, |s| s.to_uppercase()),
            Self::Lowercase => map_text(value, |s| s.to_lowercase()),
            Self::RangeMin => match value {
                ParamValue::NumberRange(r) => Some(r.min.map_or(ParamValue::Null, ParamValue::Number)),
                ParamValue::DateRange(r) => Some(r.start.map_or(ParamValue::Null, ParamValue::Date)),
                _ => None,
            },
            Self::RangeMax => match value {
                ParamValue::NumberRange(r) => Some(r.max.map_or(ParamValue::Null, ParamValue::Number)),
                ParamValue::DateRange(r) => Some(r.end.map_or(ParamValue::Null, ParamValue::Date)),
                _ => None,
            },
            Self::ToRange { width } => match value {
                ParamValue::Number(n) => {
                    Some(ParamValue::NumberRange(NumberRange::new(Some(*n), Some(n + width))))
                },
                ParamValue::Date(d) => {
                    let days = Duration::try_days(width.trunc() as i64)?;
                    Some(ParamValue::DateRange(DateRange::new(Some(*d), d.checked_add_signed(days))))
                },
                _ => None,
            },
        }
    }
}

fn map_numeric(value: &ParamValue, f: impl Fn(f64) -> f64) -> Option<ParamValue> {
    let finite = |n: f64| Some(f(n)).filter(|v| v.is_finite());
    match value {
        ParamValue::Number(n) => finite(*n).map(ParamValue::Number),
        ParamValue::NumberRange(r) => Some(ParamValue::NumberRange(NumberRange::new(
            r.min.and_then(finite),
            r.max.and_then(finite),
        ))),
        _ => None,
    }
}

fn map_text(value: &ParamValue, f: impl Fn(&str) -> String) -> Option<ParamValue> {
    match value {
        ParamValue::Text(s) => Some(ParamValue::Text(f(s))),
        ParamValue::List(items) => Some(ParamValue::List(items.iter().map(|s| f(s)).collect())),
        _ => None,
    }
}

/// A per-target transform inside a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRule {
    pub id: String,
    pub group_id: String,
    /// Control whose propagated value the rule rewrites
    pub source_id: String,
    /// Control receiving the rewritten value
    pub target_id: String,
    #[serde(default)]
    pub transform: TransformDescriptor,
    #[serde(default = "crate::models::config::default_true")]
    pub enabled: bool,
}

impl SyncRule {
    pub fn new(
        group_id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        transform: TransformDescriptor,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_id: group_id.into(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            transform,
            enabled: true,
        }
    }

    pub fn matches(&self, source_id: &str, target_id: &str) -> bool {
        self.enabled && self.source_id == source_id && self.target_id == target_id
    }
}
