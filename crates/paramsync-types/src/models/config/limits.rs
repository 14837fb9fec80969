//! URL parameter safety limits.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query-string keys owned by the host page; never treated as control ids.
pub const RESERVED_URL_PARAMS: &[&str] = &["page", "tab", "view", "mode", "debug", "theme"];

/// Caps applied before a URL parameter is trusted as a control value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct UrlLimits {
    /// Maximum number of control parameters read from one URL
    #[validate(range(min = 1_usize, max = 1_000_usize))]
    #[serde(default = "default_max_params")]
    pub max_params: usize,
    /// Maximum length of one raw parameter value
    #[validate(range(min = 16_usize, max = 65_536_usize))]
    #[serde(default = "default_max_value_len")]
    pub max_value_len: usize,
}

impl Default for UrlLimits {
    fn default() -> Self {
        Self { max_params: default_max_params(), max_value_len: default_max_value_len() }
    }
}

impl UrlLimits {
    pub fn is_reserved(key: &str) -> bool {
        RESERVED_URL_PARAMS.iter().any(|r| r.eq_ignore_ascii_case(key))
    }
}

pub const fn default_max_params() -> usize {
    50
}

pub const fn default_max_value_len() -> usize {
    2048
}
