use anyhow::Result;
use colored::Colorize;
use paramsync_core::modules::config as core_config;
use std::path::Path;

pub fn show_config(path: &Path, json: bool) -> Result<()> {
    let config = core_config::load_config(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!("{}", "Sync:".cyan().bold());
        println!("  Debounce: {}ms", config.sync.debounce_ms);
        println!("  History limit: {}", config.sync.history_limit);
        println!("{}", "URL:".cyan().bold());
        println!("  Max params: {}", config.url.max_params);
        println!("  Max value length: {}", config.url.max_value_len);
        println!("{}", "Query:".cyan().bold());
        println!("  Block invalid: {}", config.query.block_invalid);
        println!("  Placeholder prefix: {}", config.query.placeholder_prefix);
        println!("{}", "Log:".cyan().bold());
        println!("  Level: {}", config.log.level);
        println!("  JSON: {}", config.log.json);
    }
    Ok(())
}

pub fn set_config_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let parse_number = || {
        value.parse::<u64>().map_err(|_| anyhow::anyhow!("Invalid number: {}", value))
    };
    let parse_bool = || value.parse::<bool>().map_err(|_| anyhow::anyhow!("Invalid boolean: {}", value));

    let mut config = core_config::load_config(path)?;
    match key {
        "sync.debounce_ms" => config.sync.debounce_ms = parse_number()?,
        "sync.history_limit" => config.sync.history_limit = usize::try_from(parse_number()?)?,
        "url.max_params" => config.url.max_params = usize::try_from(parse_number()?)?,
        "url.max_value_len" => config.url.max_value_len = usize::try_from(parse_number()?)?,
        "query.block_invalid" => config.query.block_invalid = parse_bool()?,
        "query.placeholder_prefix" => config.query.placeholder_prefix = value.to_string(),
        "log.level" => config.log.level = value.to_string(),
        "log.json" => config.log.json = parse_bool()?,
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    core_config::save_config(&config, path)?;

    println!("{} Config updated: {} = {}", "✓".green(), key, value);
    Ok(())
}
