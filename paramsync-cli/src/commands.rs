use anyhow::Result;
use paramsync_types::models::ParamsyncConfig;
use std::path::Path;

use crate::cli::{Commands, ConfigCommands, UrlCommands};
use crate::{config_commands, filter_commands, query_commands, sync_commands, url_commands};

pub async fn handle_command(
    command: Commands,
    config: &ParamsyncConfig,
    config_path: &Path,
    json: bool,
) -> Result<()> {
    match command {
        Commands::Render { template, controls, parameterized } => {
            query_commands::render(&template, &controls, parameterized, json)
        },
        Commands::Validate { template, controls } => {
            query_commands::validate(&template, controls.as_deref(), json)
        },
        Commands::Filter { records, targets, controls } => {
            filter_commands::filter(&records, &targets, &controls, json)
        },
        Commands::Url(cmd) => handle_url_command(cmd, config, json),
        Commands::Sync { script } => sync_commands::run_script(&script, config.sync, json).await,
        Commands::Config(cmd) => handle_config_command(cmd, config_path, json),
    }
}

fn handle_url_command(cmd: UrlCommands, config: &ParamsyncConfig, json: bool) -> Result<()> {
    match cmd {
        UrlCommands::Encode { controls, base } => url_commands::encode(&controls, base.as_deref(), json),
        UrlCommands::Decode { input, controls } => {
            url_commands::decode(&input, &controls, &config.url, json)
        },
    }
}

fn handle_config_command(cmd: ConfigCommands, config_path: &Path, json: bool) -> Result<()> {
    match cmd {
        ConfigCommands::Show => config_commands::show_config(config_path, json),
        ConfigCommands::Path => {
            println!("{}", config_path.display());
            Ok(())
        },
        ConfigCommands::Set { key, value } => {
            config_commands::set_config_value(config_path, &key, &value)
        },
    }
}
