//! Template rendering in literal and parameterized mode.

use paramsync_types::ParamValue;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::params::{self, ParameterReference};
use crate::store::ControlSnapshot;

/// Placeholder prefix used when none is configured.
pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "p";

/// Result of literal-mode substitution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Substitution {
    pub sql: String,
    /// Every reference found in the template, in source order
    pub references: Vec<ParameterReference>,
    /// Reference keys rendered as `NULL` because they did not resolve
    pub unresolved: Vec<String>,
}

/// Result of parameterized-mode substitution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterizedQuery {
    pub sql: String,
    /// Placeholder name (without the leading `:`) to raw bound value
    pub params: BTreeMap<String, ParamValue>,
    pub references: Vec<ParameterReference>,
    pub unresolved: Vec<String>,
}

/// What a reference resolves to against a snapshot.
pub(crate) enum Resolved {
    Value(ParamValue),
    Missing,
}

pub(crate) fn resolve(reference: &ParameterReference, snapshot: &ControlSnapshot) -> Resolved {
    let Some(control) = snapshot.get(&reference.control_id) else {
        return Resolved::Missing;
    };
    match reference.path.as_deref() {
        None => Resolved::Value(control.value.clone()),
        Some(path) if control.value.is_null() => {
            if path_applies(control.control_type, path) {
                Resolved::Value(ParamValue::Null)
            } else {
                Resolved::Missing
            }
        },
        Some(path) => match control.value.control_type() {
            Some(ty) if path_applies(ty, path) => Resolved::Value(control.value.sub_path(path)),
            _ => Resolved::Missing,
        },
    }
}

fn path_applies(ty: paramsync_types::ControlType, path: &str) -> bool {
    use paramsync_types::ControlType;
    matches!(
        (ty, path),
        (ControlType::NumberRange, "min" | "max")
            | (ControlType::DateRange, "start" | "end" | "min" | "max")
            | (ControlType::List | ControlType::Text, "length")
    )
}

/// Render a value as a SQL literal. `None` when the value has no scalar
/// literal form (a bare range or a non-finite number).
pub fn sql_literal(value: &ParamValue) -> Option<String> {
    match value {
        ParamValue::Null => Some("NULL".to_string()),
        ParamValue::Text(s) => Some(quote(s)),
        ParamValue::Number(n) if n.is_finite() => Some(n.to_string()),
        ParamValue::Number(_) => None,
        ParamValue::Boolean(b) => Some(if *b { "1" } else { "0" }.to_string()),
        ParamValue::Date(d) => Some(quote(&d.format("%Y-%m-%d").to_string())),
        ParamValue::List(items) if items.is_empty() => Some("(NULL)".to_string()),
        ParamValue::List(items) => {
            Some(format!("({})", items.iter().map(|i| quote(i)).collect::<Vec<_>>().join(", ")))
        },
        ParamValue::NumberRange(_) | ParamValue::DateRange(_) => None,
    }
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Replace every reference with an escaped literal.
///
/// Lenient: anything that does not resolve becomes `NULL` and is listed in
/// `unresolved`. Replacement runs right-to-left so earlier offsets stay valid.
pub fn substitute(template: &str, snapshot: &ControlSnapshot) -> Substitution {
    let references = params::parse(template);
    let mut sql = template.to_string();
    let mut unresolved = Vec::new();

    for reference in references.iter().rev() {
        let literal = match resolve(reference, snapshot) {
            Resolved::Value(value) => sql_literal(&value),
            Resolved::Missing => None,
        };
        let literal = literal.unwrap_or_else(|| {
            unresolved.push(reference.key());
            "NULL".to_string()
        });
        sql.replace_range(reference.start..reference.end, &literal);
    }

    unresolved.reverse();
    if !unresolved.is_empty() {
        tracing::debug!("[query] {} reference(s) rendered as NULL: {:?}", unresolved.len(), unresolved);
    }

    Substitution { sql, references, unresolved }
}

/// Replace every reference with a named placeholder using the default prefix.
pub fn parameterize(template: &str, snapshot: &ControlSnapshot) -> ParameterizedQuery {
    parameterize_with_prefix(template, snapshot, DEFAULT_PLACEHOLDER_PREFIX)
}

/// Replace every reference with `:<prefix>_<id>[_<path>]`.
///
/// Each distinct reference gets one placeholder; repeated references reuse
/// it. No value is ever inlined into the SQL text.
pub fn parameterize_with_prefix(
    template: &str,
    snapshot: &ControlSnapshot,
    prefix: &str,
) -> ParameterizedQuery {
    let references = params::parse(template);
    let mut names: HashMap<String, String> = HashMap::new();
    let mut params = BTreeMap::new();
    let mut unresolved = Vec::new();

    // Names are assigned in source order so numbering is stable.
    for reference in &references {
        let key = reference.key();
        if names.contains_key(&key) {
            continue;
        }
        let base = format!("{}_{}", sanitize(prefix), sanitize(&key));
        let mut name = base.clone();
        let mut n = 2;
        while params.contains_key(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }

        let value = match resolve(reference, snapshot) {
            Resolved::Value(value) => value,
            Resolved::Missing => {
                unresolved.push(key.clone());
                ParamValue::Null
            },
        };
        params.insert(name.clone(), value);
        names.insert(key, name);
    }

    let mut sql = template.to_string();
    for reference in references.iter().rev() {
        if let Some(name) = names.get(&reference.key()) {
            sql.replace_range(reference.start..reference.end, &format!(":{}", name));
        }
    }

    ParameterizedQuery { sql, params, references, unresolved }
}

fn sanitize(s: &str) -> String {
    s.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect()
}
