//! Tracing subscriber setup.

use paramsync_types::models::LogConfig;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};

/// Parse a filter directive such as `info` or `paramsync_core=debug,warn`.
pub fn parse_filter(directive: &str) -> AppResult<EnvFilter> {
    EnvFilter::try_new(directive)
        .map_err(|e| AppError::Config(format!("Invalid log filter '{}': {}", directive, e)))
}

/// Install the global subscriber with RFC 3339 UTC timestamps. `RUST_LOG`
/// takes precedence over the configured level.
pub fn init_logging(config: &LogConfig) -> AppResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(&config.level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);
    let installed = if config.json { builder.json().try_init() } else { builder.try_init() };
    installed.map_err(|e| AppError::Unknown(format!("Failed to install logger: {}", e)))
}
