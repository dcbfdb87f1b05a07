//! Configuration management command
//!
//! Provides CLI interface to view the configuration.

use crate::system_config::{self, SystemConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// Show the effective configuration
pub async fn run_show(config: &SystemConfig) -> Result<()> {
    println!("{}", "Effective Configuration".bold());

    println!("\n{}", "[purge]".yellow());
    println!(
        "  {} = {} {}",
        "delay_secs".cyan(),
        config.purge.delay_secs,
        if config.policy.command.is_some() {
            "(unused: policy.command is set)".dimmed().to_string()
        } else {
            format!("({}s)", config.purge.delay_secs).dimmed().to_string()
        }
    );
    println!(
        "  {} = {} {}",
        "tick_secs".cyan(),
        config.purge.tick_secs,
        format!("({}s)", config.purge.tick_secs).dimmed()
    );
    println!(
        "  {} = {}",
        "on_fs_error".cyan(),
        match config.purge.on_fs_error {
            watcher::FailureMode::Halt => "halt",
            watcher::FailureMode::Skip => "skip",
        }
    );
    println!("  {} = {}", "recursive".cyan(), config.purge.recursive);

    println!("\n{}", "[policy]".yellow());
    match &config.policy.command {
        Some(command) => {
            println!("  {} = {}", "command".cyan(), command.display());
            println!("  {} = {:?}", "args".cyan(), config.policy.args);
            println!("  {} = {}", "monotonic".cyan(), config.policy.monotonic);
        }
        None => println!("  {}", "(quiescence threshold)".dimmed()),
    }

    println!("\n{}", "[log]".yellow());
    println!("  {} = {}", "level".cyan(), config.log.level);
    if let Some(dir) = &config.log.directory {
        println!("  {} = {}", "directory".cyan(), dir.display());
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  delay_secs: 0-604800");
    println!("  tick_secs: 1-3600");

    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    let example = system_config::example_config();
    println!("{}", example);
    Ok(())
}
