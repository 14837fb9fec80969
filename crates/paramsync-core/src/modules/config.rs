use paramsync_types::models::ParamsyncConfig;
use paramsync_types::ConfigError;
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

const DATA_DIR: &str = ".paramsync";
const CONFIG_FILE: &str = "config.json";

/// Overrides the debounce window from the environment.
pub const ENV_DEBOUNCE_MS: &str = "PARAMSYNC_DEBOUNCE_MS";
/// Overrides the log filter from the environment.
pub const ENV_LOG: &str = "PARAMSYNC_LOG";
/// Relocates the data directory.
pub const ENV_DATA_DIR: &str = "PARAMSYNC_DATA_DIR";

/// Data directory, `$PARAMSYNC_DATA_DIR` or `~/.paramsync`. Created on demand.
pub fn get_data_dir() -> Result<PathBuf, ConfigError> {
    let data_dir = if let Ok(custom_dir) = std::env::var(ENV_DATA_DIR) {
        PathBuf::from(custom_dir)
    } else {
        let home = dirs::home_dir().ok_or_else(|| ConfigError::NotFound {
            path: "home directory".to_string(),
        })?;
        home.join(DATA_DIR)
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir).map_err(|e| ConfigError::from_io_error(&e))?;
    }

    Ok(data_dir)
}

/// Default config location inside the data directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(get_data_dir()?.join(CONFIG_FILE))
}

/// Load configuration from `path`.
///
/// A missing file yields defaults. Environment overrides are applied after
/// parsing and the result is validated.
pub fn load_config(path: &Path) -> Result<ParamsyncConfig, ConfigError> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::from_json_error(&e))?
    } else {
        tracing::debug!("[config] {} not found, using defaults", path.display());
        ParamsyncConfig::default()
    };

    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// Apply `PARAMSYNC_*` environment overrides.
pub fn apply_env_overrides(config: &mut ParamsyncConfig) -> Result<(), ConfigError> {
    if let Ok(raw) = std::env::var(ENV_DEBOUNCE_MS) {
        config.sync.debounce_ms = raw.trim().parse().map_err(|_| ConfigError::ValidationError {
            field: ENV_DEBOUNCE_MS.to_string(),
            message: format!("'{}' is not a number of milliseconds", raw),
        })?;
    }
    if let Ok(level) = std::env::var(ENV_LOG) {
        if !level.trim().is_empty() {
            config.log.level = level;
        }
    }
    Ok(())
}

/// Validate ranges and lengths; the first failing field is reported.
pub fn validate_config(config: &ParamsyncConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|errors| {
        let message = errors.to_string();
        let field = message.split(':').next().unwrap_or("config").trim().to_string();
        ConfigError::ValidationError { field, message }
    })
}

/// Save configuration with an atomic temp-file rename.
pub fn save_config(config: &ParamsyncConfig, path: &Path) -> Result<(), ConfigError> {
    validate_config(config)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::from_io_error(&e))?;
        }
    }

    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(config).map_err(|e| ConfigError::WriteError {
        message: format!("Failed to serialize config: {}", e),
    })?;

    // Atomic write
    fs::write(&temp_path, content).map_err(|e| ConfigError::from_io_error(&e))?;
    fs::rename(&temp_path, path).map_err(|e| ConfigError::from_io_error(&e))
}

/// Update specific fields in the config.
pub fn update_config<F>(path: &Path, updater: F) -> Result<ParamsyncConfig, ConfigError>
where
    F: FnOnce(&mut ParamsyncConfig),
{
    let mut config = load_config(path)?;
    updater(&mut config);
    save_config(&config, path)?;
    Ok(config)
}
