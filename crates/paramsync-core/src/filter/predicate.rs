//! Filter targets (host column mappings) and the predicates derived from them.

use chrono::NaiveDate;
use paramsync_types::{ControlType, ControlValue, ParamValue};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextOp {
    #[default]
    EqualTo,
    NotEqualTo,
    Contains,
    DoesNotContain,
    StartsWith,
    DoesNotStartWith,
    EndsWith,
    DoesNotEndWith,
    MatchesRegexp,
    DoesNotMatchRegexp,
}

impl TextOp {
    pub fn is_regex(self) -> bool {
        matches!(self, Self::MatchesRegexp | Self::DoesNotMatchRegexp)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumberOp {
    #[default]
    EqualTo,
    LessThanOrEqual,
    GreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TopDirection {
    /// Highest values first
    #[default]
    Top,
    /// Lowest values first
    Bottom,
}

/// How a control's value is applied to a column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterKind {
    Text {
        #[serde(default)]
        op: TextOp,
        #[serde(default)]
        case_sensitive: bool,
    },
    Number {
        #[serde(default)]
        op: NumberOp,
    },
    Boolean,
    ListMembership,
    NumberRange,
    DateRange,
    /// `column >= value`
    Slider,
    /// Inclusive two-sided bound
    RangeSlider,
    TopN {
        #[serde(default)]
        direction: TopDirection,
        /// Treat the value as a percentage of the row count
        #[serde(default)]
        percentile: bool,
    },
    /// Value is the list of hidden series keys
    Legend {
        /// Every series the column can hold, when known
        #[serde(default)]
        series: Vec<String>,
    },
}

/// Host-supplied mapping from a control to the column it filters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterTarget {
    pub control_id: String,
    pub column: String,
    #[serde(flatten)]
    pub kind: FilterKind,
}

impl FilterTarget {
    pub fn new(control_id: impl Into<String>, column: impl Into<String>, kind: FilterKind) -> Self {
        Self { control_id: control_id.into(), column: column.into(), kind }
    }
}

/// The resolved test a predicate applies to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Text { op: TextOp, needle: String, case_sensitive: bool },
    Number { op: NumberOp, value: f64 },
    Boolean(bool),
    Membership(Vec<String>),
    NumberBetween { min: Option<f64>, max: Option<f64> },
    DateBetween { start: Option<NaiveDate>, end: Option<NaiveDate> },
    TopN { n: f64, direction: TopDirection, percentile: bool },
    Hidden { hidden: Vec<String>, series: Vec<String> },
}

/// One active filter for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPredicate {
    pub control_id: String,
    pub control_type: ControlType,
    pub column: String,
    pub condition: Condition,
}

impl FilterPredicate {
    /// Build the predicate for `target` from the control's current value.
    ///
    /// Inactive values and values the kind cannot use yield `None`: an unset
    /// control never filters anything out.
    pub fn derive(target: &FilterTarget, control: &ControlValue) -> Option<Self> {
        if !control.is_active() {
            return None;
        }
        let value = &control.value;

        let condition = match (&target.kind, value) {
            (FilterKind::Text { op, case_sensitive }, _) => Condition::Text {
                op: *op,
                needle: scalar_text(value)?,
                case_sensitive: *case_sensitive,
            },
            (FilterKind::Number { op }, _) => Condition::Number { op: *op, value: value.as_f64()? },
            (FilterKind::Boolean, ParamValue::Boolean(b)) => Condition::Boolean(*b),
            (FilterKind::ListMembership, ParamValue::List(items)) => Condition::Membership(items.clone()),
            (FilterKind::ListMembership, ParamValue::Text(s)) => Condition::Membership(vec![s.clone()]),
            (FilterKind::NumberRange | FilterKind::RangeSlider, ParamValue::NumberRange(r)) => {
                Condition::NumberBetween { min: r.min, max: r.max }
            },
            (FilterKind::Slider, _) => Condition::NumberBetween { min: Some(value.as_f64()?), max: None },
            (FilterKind::DateRange, ParamValue::DateRange(r)) => {
                Condition::DateBetween { start: r.start, end: r.end }
            },
            (FilterKind::DateRange, ParamValue::Date(d)) => {
                Condition::DateBetween { start: Some(*d), end: Some(*d) }
            },
            (FilterKind::TopN { direction, percentile }, _) => Condition::TopN {
                n: value.as_f64()?,
                direction: *direction,
                percentile: *percentile,
            },
            (FilterKind::Legend { series }, ParamValue::List(hidden)) => {
                Condition::Hidden { hidden: hidden.clone(), series: series.clone() }
            },
            (FilterKind::Legend { series }, ParamValue::Text(hidden)) => {
                Condition::Hidden { hidden: vec![hidden.clone()], series: series.clone() }
            },
            (kind, _) => {
                tracing::debug!(
                    "[filter] {} value of {} cannot drive a {:?} filter",
                    value.type_name(),
                    control.id,
                    kind
                );
                return None;
            },
        };

        Some(Self {
            control_id: control.id.clone(),
            control_type: control.control_type,
            column: target.column.clone(),
            condition,
        })
    }

    /// Top-N predicates rank the whole set instead of testing one row.
    pub fn is_ranking(&self) -> bool {
        matches!(self.condition, Condition::TopN { .. })
    }
}

fn scalar_text(value: &ParamValue) -> Option<String> {
    match value {
        ParamValue::Text(s) => Some(s.clone()),
        ParamValue::Number(n) => Some(n.to_string()),
        ParamValue::Boolean(b) => Some(b.to_string()),
        ParamValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        _ => None,
    }
}
