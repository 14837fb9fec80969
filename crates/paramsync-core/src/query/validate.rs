//! Shallow structural safety check for rendered queries.
//!
//! This is not a SQL parser. It looks for a small set of shapes that a
//! read-only dashboard query never needs and an injected payload usually has.
//! The check is advisory: it returns a report and the caller decides whether
//! to block execution.

use paramsync_types::ParamValue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::params::{self, ParameterReference};
use crate::query::render::{resolve, Resolved};
use crate::store::ControlSnapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Number of `${...}` references in the validated text
    pub parameter_count: usize,
}

impl ValidationReport {
    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

struct Patterns {
    select_start: Regex,
    from: Regex,
    stacked_mutation: Regex,
    union_select: Regex,
    select_star: Regex,
    row_limit: Regex,
    injection: Vec<(Regex, &'static str)>,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn get_patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("Validation regex is valid");
        Patterns {
            select_start: re(r"(?i)^\s*select\b"),
            from: re(r"(?i)\bfrom\b"),
            stacked_mutation: re(
                r"(?i);\s*(drop|delete|update|insert|create|alter|truncate)\b",
            ),
            union_select: re(r"(?i)\bunion(\s+all)?\s+select\b"),
            select_star: re(r"(?i)\bselect\s+(distinct\s+)?\*"),
            row_limit: re(r"(?i)\blimit\s+\d+|\btop\s*\(?\s*\d+|\bfetch\s+first\b"),
            injection: vec![
                (re(r"(?i)'\s*or\s+'[^']*'\s*=\s*'"), "quoted tautology (' OR 'x'='x)"),
                (re(r"(?i)'\s*or\s+\d+\s*=\s*\d+"), "numeric tautology (' OR 1=1)"),
                (re(r"(?i)\bor\s+1\s*=\s*1\b"), "always-true condition (OR 1=1)"),
                (
                    re(r"(?i)'\s*;\s*(drop|delete|update|insert|create|alter|truncate)\b"),
                    "quote-terminated stacked statement ('; DROP)",
                ),
            ],
        }
    })
}

/// Blank out the contents of single-quoted literals, keeping the quotes and
/// byte offsets. Returns `None` when a literal is left open.
fn mask_literals(sql: &str) -> Option<String> {
    let mut masked = String::with_capacity(sql.len());
    let mut in_literal = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            if in_literal && chars.peek() == Some(&'\'') {
                chars.next();
                masked.push_str("  ");
                continue;
            }
            in_literal = !in_literal;
            masked.push('\'');
        } else if in_literal {
            masked.push_str(&" ".repeat(c.len_utf8()));
        } else {
            masked.push(c);
        }
    }

    (!in_literal).then_some(masked)
}

fn parentheses_balanced(sql: &str) -> bool {
    let mut depth: i64 = 0;
    for c in sql.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            _ => {},
        }
    }
    depth == 0
}

/// Check a query for structural problems. Never mutates, never fails.
pub fn validate(sql: &str) -> ValidationReport {
    let patterns = get_patterns();
    let mut report = ValidationReport {
        parameter_count: params::parse(sql).len(),
        ..Default::default()
    };

    // Injection idioms straddle quotes, so they are matched on the raw text.
    for (pattern, label) in &patterns.injection {
        if pattern.is_match(sql) {
            report.error(format!("Injection pattern detected: {}", label));
        }
    }

    let masked = match mask_literals(sql) {
        Some(masked) => masked,
        None => {
            report.error("Unterminated string literal");
            sql.to_string()
        },
    };

    if sql.trim().is_empty() {
        report.error("Query is empty");
    } else if !patterns.select_start.is_match(&masked) {
        report.error("Query must start with SELECT");
    }
    if !patterns.from.is_match(&masked) {
        report.error("Query has no FROM clause");
    }
    if !parentheses_balanced(&masked) {
        report.error("Unbalanced parentheses");
    }
    if let Some(caps) = patterns.stacked_mutation.captures(&masked) {
        let keyword = caps.get(1).map_or("", |m| m.as_str()).to_uppercase();
        report.error(format!("Statement terminator followed by {}", keyword));
    }
    if patterns.union_select.is_match(&masked) {
        report.error("UNION SELECT is not allowed");
    }
    for marker in ["--", "/*", "*/", "#"] {
        if masked.contains(marker) {
            report.error(format!("Comment delimiter '{}' is not allowed", marker));
        }
    }

    if patterns.select_star.is_match(&masked) {
        report.warn("SELECT * returns every column; list the columns you need");
    }
    if !patterns.row_limit.is_match(&masked) {
        report.warn("No row-limiting clause (LIMIT, TOP or FETCH FIRST)");
    }

    report.is_valid = report.errors.is_empty();
    if !report.is_valid {
        tracing::debug!("[query] validation failed: {:?}", report.errors);
    }
    report
}

/// Errors for references bound to a number that has no SQL literal.
pub(crate) fn non_finite_bindings(
    references: &[ParameterReference],
    snapshot: &ControlSnapshot,
) -> Vec<String> {
    let mut errors: Vec<String> = Vec::new();
    for reference in references {
        let Resolved::Value(ParamValue::Number(n)) = resolve(reference, snapshot) else {
            continue;
        };
        if n.is_finite() {
            continue;
        }
        let message = format!("{} is bound to a non-finite number ({})", reference.matched, n);
        if !errors.contains(&message) {
            errors.push(message);
        }
    }
    errors
}

/// Validate the literal rendering of `template` against `snapshot`.
///
/// `parameter_count` reflects the template, not the rendered text.
pub fn validate_template(template: &str, snapshot: &ControlSnapshot) -> ValidationReport {
    let substitution = crate::query::render::substitute(template, snapshot);
    let mut report = validate(&substitution.sql);
    report.parameter_count = substitution.references.len();
    report.errors.extend(non_finite_bindings(&substitution.references, snapshot));
    report.is_valid = report.errors.is_empty();
    report
}
