//! `${control[.path]}` reference extraction.
//!
//! References are returned in source order with exact byte offsets so that a
//! caller can rewrite the template right-to-left without invalidating offsets
//! it has not processed yet.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static REFERENCE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_reference_regex() -> &'static Regex {
    REFERENCE_REGEX.get_or_init(|| {
        Regex::new(r"\$\{([^{}$]+)\}").expect("Reference regex is valid")
    })
}

/// One `${...}` occurrence in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterReference {
    /// Control id (text before the first `.`)
    pub control_id: String,
    /// Sub-path (text after the first `.`), e.g. `min` or `end`
    pub path: Option<String>,
    /// The literal `${...}` text
    pub matched: String,
    /// Byte offset of `$`
    pub start: usize,
    /// Byte offset one past `}`
    pub end: usize,
}

impl ParameterReference {
    /// `id` or `id.path`, used as the identity of a distinct reference.
    pub fn key(&self) -> String {
        match &self.path {
            Some(path) => format!("{}.{}", self.control_id, path),
            None => self.control_id.clone(),
        }
    }
}

/// Extract every well-formed reference from `template`.
///
/// Unterminated or nested braces and empty ids are skipped, not reported.
pub fn parse(template: &str) -> Vec<ParameterReference> {
    get_reference_regex()
        .captures_iter(template)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?.as_str();
            let (id, path) = match inner.split_once('.') {
                Some((id, path)) => (id.trim(), Some(path.trim())),
                None => (inner.trim(), None),
            };
            if id.is_empty() || path.is_some_and(str::is_empty) {
                return None;
            }
            Some(ParameterReference {
                control_id: id.to_string(),
                path: path.map(str::to_string),
                matched: whole.as_str().to_string(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Distinct control ids referenced by `template`, in first-seen order.
pub fn referenced_controls(template: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for reference in parse(template) {
        if !seen.contains(&reference.control_id) {
            seen.push(reference.control_id);
        }
    }
    seen
}
