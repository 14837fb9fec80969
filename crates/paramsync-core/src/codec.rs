//! Value codec: typed control values to URL-safe text and back.
//!
//! Both directions are total. `decode` never fails; anything it cannot read
//! becomes `ParamValue::Null`. For every finite value `v` of type `t`,
//! `decode(&encode(&v, t), t) == v`.
//!
//! Wire format:
//!
//! ```text
//! text          percent-encoded            north%20east
//! number        shortest decimal           100 | 2.5 | -0.25
//! boolean       true | false
//! date          YYYY-MM-DD                 2024-01-31
//! ranges        min:<a>,max:<b>            min:10,max: | min:2024-01-01,max:2024-01-31
//! list          items escaped, comma-joined us,eu,north%2Cwest
//! explicit null ~null
//! explicit ""   ~empty
//! "" list item  ~e                         us,~e,eu
//! ```
//!
//! `~` is outside the unescaped set, so an encoded value never collides with
//! a sentinel.

use chrono::NaiveDate;
use paramsync_types::models::parse_date;
use paramsync_types::{ControlType, DateRange, NumberRange, ParamValue};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Explicit null, as opposed to an absent key.
pub const NULL_TOKEN: &str = "~null";
/// Explicit empty string / empty list.
pub const EMPTY_TOKEN: &str = "~empty";
/// An empty item inside a list. Distinct from [`EMPTY_TOKEN`] so `[""]` and `[]` differ.
pub const EMPTY_ITEM_TOKEN: &str = "~e";

/// Everything except `A-Z a-z 0-9 - _ .` is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Encode a value for a control of type `ty`.
pub fn encode(value: &ParamValue, ty: ControlType) -> String {
    if !value.is_null() && value.control_type() != Some(ty) {
        tracing::debug!(
            "[codec] {} value does not fit a {} control, encoding as null",
            value.type_name(),
            ty
        );
        return NULL_TOKEN.to_string();
    }

    match value {
        ParamValue::Null => NULL_TOKEN.to_string(),
        ParamValue::Text(s) if s.is_empty() => EMPTY_TOKEN.to_string(),
        ParamValue::Text(s) => escape_component(s),
        ParamValue::Number(n) => format_number(*n).unwrap_or_else(|| NULL_TOKEN.to_string()),
        ParamValue::Boolean(b) => b.to_string(),
        ParamValue::Date(d) => format_date(*d),
        ParamValue::NumberRange(r) => format!(
            "min:{},max:{}",
            r.min.and_then(format_number).unwrap_or_default(),
            r.max.and_then(format_number).unwrap_or_default()
        ),
        ParamValue::DateRange(r) => format!(
            "min:{},max:{}",
            r.start.map(format_date).unwrap_or_default(),
            r.end.map(format_date).unwrap_or_default()
        ),
        ParamValue::List(items) if items.is_empty() => EMPTY_TOKEN.to_string(),
        ParamValue::List(items) => items
            .iter()
            .map(|item| if item.is_empty() { EMPTY_ITEM_TOKEN.to_string() } else { escape_component(item) })
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Decode text produced by [`encode`] (or typed by a person) for type `ty`.
pub fn decode(raw: &str, ty: ControlType) -> ParamValue {
    match raw {
        NULL_TOKEN | "" => return ParamValue::Null,
        EMPTY_TOKEN => {
            return match ty {
                ControlType::Text => ParamValue::Text(String::new()),
                ControlType::List => ParamValue::List(Vec::new()),
                _ => ParamValue::Null,
            };
        },
        _ => {},
    }

    let decoded = match ty {
        ControlType::Text => unescape_component(raw).map(ParamValue::Text),
        ControlType::Number => unescape_component(raw)
            .and_then(|s| parse_number(&s))
            .map(ParamValue::Number),
        ControlType::Boolean => unescape_component(raw)
            .and_then(|s| parse_bool(&s))
            .map(ParamValue::Boolean),
        ControlType::Date => unescape_component(raw)
            .and_then(|s| parse_date(&s))
            .map(ParamValue::Date),
        ControlType::NumberRange => decode_range(raw, parse_number)
            .map(|(min, max)| ParamValue::NumberRange(NumberRange::new(min, max))),
        ControlType::DateRange => decode_range(raw, parse_date)
            .map(|(start, end)| ParamValue::DateRange(DateRange::new(start, end))),
        ControlType::List => raw
            .split(',')
            .map(|item| {
                if item == EMPTY_ITEM_TOKEN {
                    Some(String::new())
                } else {
                    unescape_component(item)
                }
            })
            .collect::<Option<Vec<_>>>()
            .map(ParamValue::List),
    };

    decoded.unwrap_or_else(|| {
        tracing::debug!("[codec] could not decode {:?} as {}", raw, ty);
        ParamValue::Null
    })
}

/// Percent-encode a single component (key or value fragment).
pub fn escape_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Reverse [`escape_component`]; `None` on invalid UTF-8.
pub fn unescape_component(s: &str) -> Option<String> {
    percent_decode_str(s).decode_utf8().ok().map(|cow| cow.into_owned())
}

fn format_number(n: f64) -> Option<String> {
    n.is_finite().then(|| n.to_string())
}

fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Split `min:<a>,max:<b>`; an empty bound is open, an unparseable one
/// invalidates the whole range.
fn decode_range<T>(raw: &str, parse: fn(&str) -> Option<T>) -> Option<(Option<T>, Option<T>)> {
    let text = if raw.starts_with("min:") {
        raw.to_string()
    } else {
        unescape_component(raw)?
    };
    let (lo, hi) = text.split_once(',')?;
    let lo = lo.trim().strip_prefix("min:")?;
    let hi = hi.trim().strip_prefix("max:")?;

    let bound = |s: &str| -> Option<Option<T>> {
        if s.is_empty() {
            Some(None)
        } else {
            parse(s).map(Some)
        }
    };
    Some((bound(lo)?, bound(hi)?))
}
