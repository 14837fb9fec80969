//! Control identity, type tags and the stored value record.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value::ParamValue;

/// A host record as seen by filtering and query execution.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The fixed set of control value types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    Text,
    Number,
    Boolean,
    Date,
    DateRange,
    NumberRange,
    List,
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
            Self::DateRange => write!(f, "date_range"),
            Self::NumberRange => write!(f, "number_range"),
            Self::List => write!(f, "list"),
        }
    }
}

impl ControlType {
    /// Parse from string. Accepts both `snake_case` and `kebab-case`.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "text" => Some(Self::Text),
            "number" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "date" => Some(Self::Date),
            "date_range" => Some(Self::DateRange),
            "number_range" => Some(Self::NumberRange),
            "list" => Some(Self::List),
            _ => None,
        }
    }

    /// Range types only produce scalars through a `.min`/`.max` style sub-path.
    pub fn is_range(self) -> bool {
        matches!(self, Self::DateRange | Self::NumberRange)
    }
}

/// Current value of one registered control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlValue {
    /// Unique control identifier
    pub id: String,
    /// Declared type of the control
    pub control_type: ControlType,
    /// Current value, `Null` when cleared
    pub value: ParamValue,
    /// Unix timestamp in milliseconds of the last write
    pub updated_at: i64,
}

impl ControlValue {
    /// Create a control value stamped with the current time.
    pub fn new(id: impl Into<String>, control_type: ControlType, value: ParamValue) -> Self {
        Self {
            id: id.into(),
            control_type,
            value,
            updated_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// A control is active when its value is neither null nor empty.
    pub fn is_active(&self) -> bool {
        self.value.is_active()
    }
}
