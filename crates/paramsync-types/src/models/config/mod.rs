//! Application configuration models.

mod app;
mod limits;

pub use app::{LogConfig, ParamsyncConfig, QueryConfig, SyncConfig};
pub use limits::{UrlLimits, RESERVED_URL_PARAMS};

// Default value functions
pub const fn default_true() -> bool {
    true
}
