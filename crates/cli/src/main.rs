//! Quiesce CLI - quiesce command

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli_lib::cmd::{self, watch::WatchArgs};
use cli_lib::{logging, system_config};
use std::path::PathBuf;

/// Quiesce - purge files once they stop changing
#[derive(Parser)]
#[command(name = "quiesce")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/quiesce/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch paths and delete them once they have been quiet long enough
    Watch(WatchArgs),
    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the default config file location
    Path {
        /// Create the file with defaults if it is missing
        #[arg(long)]
        create: bool,
    },
    /// Print the effective configuration
    Show,
    /// Print an annotated example config file
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = system_config::load(cli.config.as_deref())?;
    let _log_guard = logging::init(&config.log)?;

    match cli.command {
        Commands::Watch(args) => cmd::watch::run(args, config).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Show => cmd::config::run_show(&config).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
