//! Tagged control values.
//!
//! Every control type maps to exactly one `ParamValue` variant. Hosts often
//! hand over loosely shaped JSON (a range as `[a, b]` or as `{min, max}`,
//! numbers as strings, date-times where a day is meant); `ParamValue::from_loose`
//! normalizes those shapes once at the boundary so the rest of the workspace
//! only ever matches on variants.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::control::ControlType;

/// Inclusive numeric range; either bound may be open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct NumberRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl NumberRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Inclusive calendar-day range; either bound may be open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DateRange {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// A control's value, one variant per [`ControlType`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateRange(DateRange),
    NumberRange(NumberRange),
    List(Vec<String>),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Active means "has an opinion": not null and not empty.
    pub fn is_active(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Text(s) => !s.is_empty(),
            Self::Number(_) | Self::Boolean(_) | Self::Date(_) => true,
            Self::DateRange(r) => !r.is_open(),
            Self::NumberRange(r) => !r.is_open(),
            Self::List(items) => !items.is_empty(),
        }
    }

    /// The control type this variant belongs to (`None` for `Null`).
    pub fn control_type(&self) -> Option<ControlType> {
        match self {
            Self::Null => None,
            Self::Text(_) => Some(ControlType::Text),
            Self::Number(_) => Some(ControlType::Number),
            Self::Boolean(_) => Some(ControlType::Boolean),
            Self::Date(_) => Some(ControlType::Date),
            Self::DateRange(_) => Some(ControlType::DateRange),
            Self::NumberRange(_) => Some(ControlType::NumberRange),
            Self::List(_) => Some(ControlType::List),
        }
    }

    /// Short name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::DateRange(_) => "date_range",
            Self::NumberRange(_) => "number_range",
            Self::List(_) => "list",
        }
    }

    /// Whether this value may be stored in a control of type `ty`.
    pub fn fits(&self, ty: ControlType) -> bool {
        self.control_type().is_none_or(|own| own == ty)
    }

    /// Resolve a reference sub-path such as `min`, `end` or `length`.
    ///
    /// Unknown paths resolve to `Null`.
    pub fn sub_path(&self, path: &str) -> ParamValue {
        match (self, path) {
            (Self::NumberRange(r), "min") => r.min.map_or(Self::Null, Self::Number),
            (Self::NumberRange(r), "max") => r.max.map_or(Self::Null, Self::Number),
            (Self::DateRange(r), "start" | "min") => r.start.map_or(Self::Null, Self::Date),
            (Self::DateRange(r), "end" | "max") => r.end.map_or(Self::Null, Self::Date),
            (Self::List(items), "length") => Self::Number(items.len() as f64),
            (Self::Text(s), "length") => Self::Number(s.chars().count() as f64),
            _ => Self::Null,
        }
    }

    /// Numeric view of a scalar, used by transforms and sliders.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Raw JSON form, as handed to prepared-statement bindings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(JsonValue::Null, JsonValue::Number),
            Self::Boolean(b) => JsonValue::Bool(*b),
            Self::Date(d) => JsonValue::String(d.format("%Y-%m-%d").to_string()),
            Self::DateRange(r) => serde_json::json!({
                "start": r.start.map(|d| d.format("%Y-%m-%d").to_string()),
                "end": r.end.map(|d| d.format("%Y-%m-%d").to_string()),
            }),
            Self::NumberRange(r) => serde_json::json!({ "min": r.min, "max": r.max }),
            Self::List(items) => {
                JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
            },
        }
    }

    /// Normalize a loosely shaped host value into the variant for `ty`.
    ///
    /// Total: anything that cannot be converted becomes `Null`.
    pub fn from_loose(value: &JsonValue, ty: ControlType) -> ParamValue {
        if value.is_null() {
            return Self::Null;
        }
        match ty {
            ControlType::Text => json_scalar_text(value).map_or(Self::Null, Self::Text),
            ControlType::Number => loose_number(value).map_or(Self::Null, Self::Number),
            ControlType::Boolean => loose_bool(value).map_or(Self::Null, Self::Boolean),
            ControlType::Date => value.as_str().and_then(parse_date).map_or(Self::Null, Self::Date),
            ControlType::NumberRange => match range_parts(value, ("min", "max")) {
                Some((lo, hi)) => Self::NumberRange(NumberRange::new(
                    lo.and_then(loose_number),
                    hi.and_then(loose_number),
                )),
                None => Self::Null,
            },
            ControlType::DateRange => match range_parts(value, ("start", "end"))
                .or_else(|| range_parts(value, ("min", "max")))
            {
                Some((lo, hi)) => Self::DateRange(DateRange::new(
                    lo.and_then(JsonValue::as_str).and_then(parse_date),
                    hi.and_then(JsonValue::as_str).and_then(parse_date),
                )),
                None => Self::Null,
            },
            ControlType::List => match value {
                JsonValue::Array(items) => {
                    Self::List(items.iter().filter_map(json_scalar_text).collect())
                },
                other => json_scalar_text(other).map_or(Self::Null, |s| Self::List(vec![s])),
            },
        }
    }
}

/// Parse a calendar day from `YYYY-MM-DD` or a date-time string.
///
/// Time-of-day is dropped; an offset date-time keeps its local calendar day.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

fn json_scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn loose_number(value: &JsonValue) -> Option<f64> {
    let n = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn loose_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => match n.as_f64() {
            Some(v) if v == 0.0 => Some(false),
            Some(v) if v == 1.0 => Some(true),
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

/// Split a range given as `[lo, hi]` or as an object keyed by `keys`.
fn range_parts<'a>(
    value: &'a JsonValue,
    keys: (&str, &str),
) -> Option<(Option<&'a JsonValue>, Option<&'a JsonValue>)> {
    match value {
        JsonValue::Array(items) if items.len() == 2 => Some((items.first(), items.get(1))),
        JsonValue::Object(map) if map.contains_key(keys.0) || map.contains_key(keys.1) => {
            Some((map.get(keys.0), map.get(keys.1)))
        },
        _ => None,
    }
}
