//! Top-level configuration and its sections.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::default_true;
use super::limits::UrlLimits;

/// Full paramsync configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct ParamsyncConfig {
    /// Sync coordinator tuning
    #[serde(default)]
    #[validate(nested)]
    pub sync: SyncConfig,
    /// URL parameter safety limits
    #[serde(default)]
    #[validate(nested)]
    pub url: UrlLimits,
    /// Query rendering and execution
    #[serde(default)]
    #[validate(nested)]
    pub query: QueryConfig,
    /// Logging output
    #[serde(default)]
    #[validate(nested)]
    pub log: LogConfig,
}

/// Sync coordinator configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct SyncConfig {
    /// Debounce window in milliseconds
    #[validate(range(min = 10_u64, max = 60_000_u64))]
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Per-group history capacity; oldest events are evicted past it
    #[validate(range(min = 1_usize, max = 10_000_usize))]
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { debounce_ms: default_debounce_ms(), history_limit: default_history_limit() }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.debounce_ms)
    }
}

/// Query rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct QueryConfig {
    /// Refuse to hand an invalid query to the executor
    #[serde(default = "default_true")]
    pub block_invalid: bool,
    /// Prefix of generated placeholder names (`:<prefix>_<control>`)
    #[validate(length(min = 1_u64, max = 16_u64))]
    #[serde(default = "default_placeholder_prefix")]
    pub placeholder_prefix: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { block_invalid: true, placeholder_prefix: default_placeholder_prefix() }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[validate(length(min = 1_u64))]
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

pub const fn default_debounce_ms() -> u64 {
    300
}

pub const fn default_history_limit() -> usize {
    100
}

fn default_placeholder_prefix() -> String {
    "p".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: ParamsyncConfig = serde_json::from_str("{}").unwrap_or_default();
        assert_eq!(config.sync.debounce_ms, 300);
        assert_eq!(config.sync.history_limit, 100);
        assert!(config.query.block_invalid);
        assert_eq!(config.url.max_params, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_debounce_rejected() {
        let config = ParamsyncConfig {
            sync: SyncConfig { debounce_ms: 0, history_limit: 10 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
