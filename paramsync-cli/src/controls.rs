//! Input files shared by the commands.

use anyhow::{Context, Result};
use paramsync_core::ControlStore;
use paramsync_types::{ControlType, ParamValue};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// One entry of a controls file. `value` may use any loose host shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub control_type: ControlType,
    #[serde(default)]
    pub value: serde_json::Value,
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Register every control with its loose value normalized to its type.
pub fn build_store(specs: &[ControlSpec]) -> Result<Arc<ControlStore>> {
    let store = Arc::new(ControlStore::new());
    for spec in specs {
        let value = ParamValue::from_loose(&spec.value, spec.control_type);
        if value.is_null() && !spec.value.is_null() {
            tracing::warn!("Control {} has a value that is not a {}, starting empty", spec.id, spec.control_type);
        }
        store.register(spec.id.clone(), spec.control_type, value)?;
    }
    Ok(store)
}

pub fn load_store(path: &Path) -> Result<Arc<ControlStore>> {
    let specs: Vec<ControlSpec> = read_json(path)?;
    build_store(&specs)
}

/// A template argument, or the contents of the file named after a leading `@`.
pub fn read_template(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path)),
        None => Ok(arg.to_string()),
    }
}

/// Compact display of a value for tables.
pub fn display_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Null => "-".to_string(),
        ParamValue::Text(s) => s.clone(),
        other => other.to_json().to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_store_normalizes_loose_values() {
        let specs: Vec<ControlSpec> = serde_json::from_value(serde_json::json!([
            {"id": "amount", "type": "number_range", "value": [10, 50]},
            {"id": "regions", "type": "list", "value": "US"},
            {"id": "minTotal", "type": "number", "value": "100"},
            {"id": "since", "type": "date"}
        ]))
        .unwrap();
        let store = build_store(&specs).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.value("regions"), Some(&ParamValue::List(vec!["US".into()])));
        assert_eq!(snapshot.value("minTotal"), Some(&ParamValue::Number(100.0)));
        assert_eq!(snapshot.value("since"), Some(&ParamValue::Null));
        assert_eq!(snapshot.len(), 4);
    }

    #[test]
    fn test_read_template_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q.sql");
        std::fs::write(&path, "SELECT 1 FROM t").unwrap();
        assert_eq!(read_template(&format!("@{}", path.display())).unwrap(), "SELECT 1 FROM t");
        assert_eq!(read_template("SELECT 2 FROM t").unwrap(), "SELECT 2 FROM t");
    }
}
