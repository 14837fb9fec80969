//! Shareable URL state.
//!
//! Every active control is written as one `id=value` pair using the codec's
//! wire format. When reading a URL, reserved host keys and unknown ids are
//! skipped. Oversized values, excess pairs and anything that looks like script
//! injection are rejected before they reach the codec.
//! Absence of a key means "no opinion", so a decode never clears a control
//! unless the URL says `~null` explicitly.

use paramsync_types::models::UrlLimits;
use paramsync_types::{ChangeSource, ControlType, ParamValue};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;
use url::Url;

use crate::codec::{self, escape_component, unescape_component};
use crate::store::{ControlSnapshot, ControlStore};

static SCRIPT_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_script_regex() -> &'static Regex {
    SCRIPT_REGEX.get_or_init(|| {
        Regex::new(r#"(?i)<\s*/?\s*script|javascript\s*:|vbscript\s*:|data\s*:\s*text/html|[\s"'/<]on[a-z]+\s*="#)
            .expect("Script pattern regex is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    TooLong { len: usize, max: usize },
    TooMany { max: usize },
    ScriptPattern,
    Undecodable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedParam {
    pub key: String,
    #[serde(flatten)]
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UrlDecodeResult {
    /// Accepted control values keyed by control id
    pub values: BTreeMap<String, ParamValue>,
    pub rejected: Vec<RejectedParam>,
}

/// Canonical query string for every active control, keys sorted.
pub fn encode_query(snapshot: &ControlSnapshot) -> String {
    let mut controls: Vec<_> = snapshot
        .active()
        .filter(|c| {
            let reserved = UrlLimits::is_reserved(&c.id);
            if reserved {
                tracing::warn!("[url] Control id {} collides with a reserved parameter", c.id);
            }
            !reserved
        })
        .collect();
    controls.sort_by(|a, b| a.id.cmp(&b.id));

    controls
        .iter()
        .map(|c| format!("{}={}", escape_component(&c.id), codec::encode(&c.value, c.control_type)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Whether a raw parameter value carries a script-injection payload.
pub fn is_script_like(raw: &str) -> bool {
    let regex = get_script_regex();
    if regex.is_match(raw) {
        return true;
    }
    unescape_component(raw).is_some_and(|decoded| regex.is_match(&decoded))
}

/// Read control values from a query string (with or without leading `?`).
pub fn decode_query(
    query: &str,
    types: &HashMap<String, ControlType>,
    limits: &UrlLimits,
) -> UrlDecodeResult {
    let mut result = UrlDecodeResult::default();
    let mut accepted_count = 0usize;

    let query = query.strip_prefix('?').unwrap_or(query);
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let Some(key) = unescape_component(raw_key) else {
            continue;
        };
        if UrlLimits::is_reserved(&key) {
            continue;
        }
        let Some(&control_type) = types.get(&key) else {
            tracing::debug!("[url] Ignoring unknown parameter {}", key);
            continue;
        };

        let reject = |reason: RejectReason| {
            tracing::warn!("[url] Rejected parameter {}: {:?}", key, reason);
            RejectedParam { key: key.clone(), reason }
        };

        if accepted_count >= limits.max_params {
            result.rejected.push(reject(RejectReason::TooMany { max: limits.max_params }));
            continue;
        }
        if raw_value.len() > limits.max_value_len {
            result.rejected.push(reject(RejectReason::TooLong {
                len: raw_value.len(),
                max: limits.max_value_len,
            }));
            continue;
        }
        if is_script_like(raw_value) {
            result.rejected.push(reject(RejectReason::ScriptPattern));
            continue;
        }

        let value = codec::decode(raw_value, control_type);
        if value.is_null() && raw_value != codec::NULL_TOKEN && raw_value != codec::EMPTY_TOKEN {
            result.rejected.push(reject(RejectReason::Undecodable));
            continue;
        }

        accepted_count += 1;
        result.values.insert(key, value);
    }

    result
}

/// Read control values from a full URL.
pub fn decode_url(
    url: &str,
    types: &HashMap<String, ControlType>,
    limits: &UrlLimits,
) -> Result<UrlDecodeResult, url::ParseError> {
    let parsed = Url::parse(url)?;
    Ok(decode_query(parsed.query().unwrap_or_default(), types, limits))
}

/// Rewrite `url` so its control parameters reflect `snapshot`.
///
/// Host parameters (reserved keys and keys that are not controls) are kept in
/// their original order ahead of the control parameters.
pub fn merge_into_url(url: &str, snapshot: &ControlSnapshot) -> Result<String, url::ParseError> {
    let mut parsed = Url::parse(url)?;
    let kept: Vec<&str> = parsed
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| {
            if pair.is_empty() {
                return false;
            }
            let raw_key = pair.split_once('=').map_or(*pair, |(k, _)| k);
            match unescape_component(raw_key) {
                Some(key) => UrlLimits::is_reserved(&key) || snapshot.get(&key).is_none(),
                None => true,
            }
        })
        .collect();

    let controls = encode_query(snapshot);
    let mut parts: Vec<String> = kept.into_iter().map(str::to_string).collect();
    if !controls.is_empty() {
        parts.push(controls);
    }
    let query = parts.join("&");
    parsed.set_query((!query.is_empty()).then_some(query.as_str()));
    Ok(parsed.to_string())
}

/// Write decoded values into the store with source `url`.
///
/// Returns the number of controls written; failures are logged and skipped.
pub fn apply_to_store(store: &ControlStore, result: &UrlDecodeResult) -> usize {
    let mut applied = 0;
    for (id, value) in &result.values {
        match store.set_value(id.clone(), value.clone(), ChangeSource::Url) {
            Ok(_) => applied += 1,
            Err(e) => tracing::warn!("[url] Could not restore {}: {}", id, e),
        }
    }
    if applied > 0 {
        tracing::info!("[url] Restored {} control value(s) from URL", applied);
    }
    applied
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use paramsync_types::{ControlValue, DateRange, NumberRange};

    fn snapshot() -> ControlSnapshot {
        ControlSnapshot::from_controls([
            ControlValue::new("region", ControlType::Text, ParamValue::Text("north east".into())),
            ControlValue::new(
                "amount",
                ControlType::NumberRange,
                ParamValue::NumberRange(NumberRange::new(Some(10.0), Some(50.0))),
            ),
            ControlValue::new("empty", ControlType::Text, ParamValue::Text(String::new())),
            ControlValue::new(
                "period",
                ControlType::DateRange,
                ParamValue::DateRange(DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 1), None)),
            ),
            ControlValue::new("tags", ControlType::List, ParamValue::List(vec!["a,b".into(), "c".into()])),
        ])
    }

    #[test]
    fn test_encode_is_sorted_and_skips_inactive() {
        let query = encode_query(&snapshot());
        assert_eq!(
            query,
            "amount=min:10,max:50&period=min:2024-01-01,max:&region=north%20east&tags=a%2Cb,c"
        );
    }

    #[test]
    fn test_round_trip_through_query() {
        let snap = snapshot();
        let decoded = decode_query(&encode_query(&snap), &snap.types(), &UrlLimits::default());
        assert!(decoded.rejected.is_empty());
        for (id, value) in &decoded.values {
            assert_eq!(snap.value(id), Some(value));
        }
        assert_eq!(decoded.values.len(), 4);
    }

    #[test]
    fn test_reserved_and_unknown_keys_are_skipped() {
        let snap = snapshot();
        let decoded = decode_query(
            "?page=2&tab=sales&ghost=1&region=US",
            &snap.types(),
            &UrlLimits::default(),
        );
        assert!(decoded.rejected.is_empty());
        assert_eq!(decoded.values.len(), 1);
        assert_eq!(decoded.values["region"], ParamValue::Text("US".into()));
    }

    #[test]
    fn test_script_payloads_are_rejected() {
        let snap = snapshot();
        for payload in [
            "%3Cscript%3Ealert(1)%3C%2Fscript%3E",
            "javascript%3Aalert(1)",
            "x%22%20onerror%3Dalert(1)",
            "data%3Atext%2Fhtml%2Cboom",
        ] {
            let decoded =
                decode_query(&format!("region={}", payload), &snap.types(), &UrlLimits::default());
            assert!(decoded.values.is_empty(), "accepted {}", payload);
            assert_eq!(decoded.rejected[0].reason, RejectReason::ScriptPattern);
        }
    }

    #[test]
    fn test_plain_text_resembling_handlers_is_accepted() {
        let snap = snapshot();
        for (payload, text) in [
            ("online%3Dyes", "online=yes"),
            ("moonlight%3Dbright", "moonlight=bright"),
            ("status%20is%20on", "status is on"),
        ] {
            let decoded =
                decode_query(&format!("region={}", payload), &snap.types(), &UrlLimits::default());
            assert!(decoded.rejected.is_empty(), "rejected {}", payload);
            assert_eq!(decoded.values["region"], ParamValue::Text(text.into()));
        }
        let handler = decode_query("region=%3Cimg%2Fonload%3Dx", &snap.types(), &UrlLimits::default());
        assert_eq!(handler.rejected[0].reason, RejectReason::ScriptPattern);
    }

    #[test]
    fn test_length_and_count_caps() {
        let snap = snapshot();
        let limits = UrlLimits { max_params: 1, max_value_len: 16 };

        let long = decode_query(&format!("region={}", "x".repeat(17)), &snap.types(), &limits);
        assert_eq!(long.rejected[0].reason, RejectReason::TooLong { len: 17, max: 16 });

        let many = decode_query("region=a&tags=b", &snap.types(), &limits);
        assert_eq!(many.values.len(), 1);
        assert_eq!(many.rejected[0].reason, RejectReason::TooMany { max: 1 });
    }

    #[test]
    fn test_garbage_is_rejected_but_explicit_null_is_kept() {
        let snap = snapshot();
        let decoded =
            decode_query("amount=banana&region=~null", &snap.types(), &UrlLimits::default());
        assert_eq!(decoded.rejected[0].reason, RejectReason::Undecodable);
        assert_eq!(decoded.values["region"], ParamValue::Null);
    }

    #[test]
    fn test_merge_keeps_host_params() {
        let snap = ControlSnapshot::from_controls([ControlValue::new(
            "region",
            ControlType::Text,
            ParamValue::Text("EU".into()),
        )]);
        let url = merge_into_url("https://dash.example.com/sales?tab=2&region=US&utm=x", &snap).unwrap();
        assert_eq!(url, "https://dash.example.com/sales?tab=2&utm=x&region=EU");

        let decoded = decode_url(&url, &snap.types(), &UrlLimits::default()).unwrap();
        assert_eq!(decoded.values["region"], ParamValue::Text("EU".into()));
    }

    #[test]
    fn test_apply_to_store_uses_url_source() {
        let store = ControlStore::new();
        store.register("region", ControlType::Text, ParamValue::Null).unwrap();
        let mut rx = store.subscribe();

        let decoded = decode_query("region=US", &store.snapshot().types(), &UrlLimits::default());
        assert_eq!(apply_to_store(&store, &decoded), 1);

        let change = rx.try_recv().unwrap();
        assert_eq!(change.source, ChangeSource::Url);
        assert_eq!(change.new_value, ParamValue::Text("US".into()));
    }
}
