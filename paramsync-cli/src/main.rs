//! paramsync CLI - headless front end
//!
//! Exercises the core against JSON inputs:
//! - Renders and validates query templates
//! - Filters record files by control values
//! - Encodes and decodes shareable URL state
//! - Replays scripted sessions through the sync coordinator

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

mod cli;
mod commands;
mod config_commands;
mod controls;
mod filter_commands;
mod query_commands;
mod sync_commands;
mod url_commands;

use cli::Cli;
use paramsync_core::modules::{config as core_config, logger};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => core_config::default_config_path().context("Failed to locate config file")?,
    };
    let mut config = core_config::load_config(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(level) = &cli.log_level {
        config.log.level = level.clone();
    }
    logger::init_logging(&config.log)?;

    tracing::debug!("[config] Using {}", config_path.display());

    if let Err(e) = commands::handle_command(cli.command, &config, &config_path, cli.json).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}
