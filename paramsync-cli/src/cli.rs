use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "paramsync",
    about = "paramsync - control values, query templates and sync groups",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, env = "PARAMSYNC_CONFIG", help = "Path to config.json")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Log filter, e.g. 'info' or 'paramsync_core=debug'")]
    pub log_level: Option<String>,

    #[arg(long, global = true, help = "Output as JSON")]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Render a query template against control values")]
    Render {
        #[arg(help = "Template text, or @path to read it from a file")]
        template: String,

        #[arg(short = 'C', long, help = "Controls file: [{\"id\", \"type\", \"value\"}]")]
        controls: PathBuf,

        #[arg(long, help = "Emit named placeholders and a binding map instead of literals")]
        parameterized: bool,
    },

    #[command(about = "Check a query (or a template rendered against controls) for safety")]
    Validate {
        #[arg(help = "Query text, or @path to read it from a file")]
        template: String,

        #[arg(short = 'C', long, help = "Render against these controls before validating")]
        controls: Option<PathBuf>,
    },

    #[command(about = "Filter JSON records by control values")]
    Filter {
        #[arg(short, long, help = "JSON array of record objects")]
        records: PathBuf,

        #[arg(short, long, help = "JSON array of filter targets")]
        targets: PathBuf,

        #[arg(short = 'C', long, help = "Controls file")]
        controls: PathBuf,
    },

    #[command(subcommand, about = "Encode or decode shareable URL state")]
    Url(UrlCommands),

    #[command(about = "Replay a scripted session through the sync coordinator")]
    Sync {
        #[arg(short, long, help = "JSON script with controls, groups and timed changes")]
        script: PathBuf,
    },

    #[command(subcommand, about = "View and modify configuration")]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum UrlCommands {
    #[command(about = "Encode active control values as a query string")]
    Encode {
        #[arg(short = 'C', long, help = "Controls file")]
        controls: PathBuf,

        #[arg(long, help = "Merge into this URL, keeping its other parameters")]
        base: Option<String>,
    },

    #[command(about = "Decode a query string or full URL into control values")]
    Decode {
        #[arg(help = "Query string (with or without '?') or an absolute URL")]
        input: String,

        #[arg(short = 'C', long, help = "Controls file declaring the known controls")]
        controls: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    #[command(about = "Show current configuration")]
    Show,

    #[command(about = "Print the configuration file location")]
    Path,

    #[command(about = "Set a configuration value")]
    Set {
        #[arg(help = "Configuration key (e.g., 'sync.debounce_ms', 'url.max_params')")]
        key: String,

        #[arg(help = "New value")]
        value: String,
    },
}
