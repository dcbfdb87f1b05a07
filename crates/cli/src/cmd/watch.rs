//! Watch paths and purge them once they go quiet

use crate::render;
use crate::system_config::SystemConfig;
use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use watcher::{FailureMode, NotifySource, PurgeService, Reporter};

/// Arguments for `quiesce watch`
#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// Paths to watch
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Seconds a path must stay unmodified before it is purged
    #[arg(long, value_name = "SECS", conflicts_with = "policy_cmd")]
    pub delay: Option<u64>,

    /// Seconds between periodic purge passes
    #[arg(long, value_name = "SECS")]
    pub tick: Option<u64>,

    /// External policy program deciding purge eligibility
    #[arg(long, value_name = "PROGRAM")]
    pub policy_cmd: Option<PathBuf>,

    /// Argument passed to the policy program (repeatable)
    #[arg(long, value_name = "ARG", requires = "policy_cmd", allow_hyphen_values = true)]
    pub policy_arg: Vec<String>,

    /// Declare the policy program monotonic so passes stop at the first denial
    #[arg(long, requires = "policy_cmd")]
    pub policy_monotonic: bool,

    /// Watch directories recursively
    #[arg(long)]
    pub recursive: bool,

    /// Skip paths that fail to stat or delete instead of stopping
    #[arg(long)]
    pub keep_going: bool,
}

impl WatchArgs {
    /// Overlay command-line flags on the loaded configuration
    pub fn apply(&self, mut config: SystemConfig) -> Result<SystemConfig> {
        if let Some(delay) = self.delay {
            config.purge.delay_secs = delay;
        }
        if let Some(tick) = self.tick {
            config.purge.tick_secs = tick;
        }
        if let Some(program) = &self.policy_cmd {
            config.policy.command = Some(program.clone());
            config.policy.args = self.policy_arg.clone();
            config.policy.monotonic = self.policy_monotonic;
        }
        if self.recursive {
            config.purge.recursive = true;
        }
        if self.keep_going {
            config.purge.on_fs_error = FailureMode::Skip;
        }

        config.validate().context("Invalid watch options")?;
        Ok(config)
    }
}

pub async fn run(args: WatchArgs, config: SystemConfig) -> Result<()> {
    let config = args.apply(config)?;
    let recursive = config.purge.recursive;

    let (reporter, activity) = Reporter::channel();
    let printer = tokio::spawn(render::print_activity(activity));

    let service = PurgeService::new(config.policy(), config.settings()).with_reporter(reporter);
    let result = service
        .run(
            args.paths,
            move || NotifySource::new(recursive),
            shutdown_signal(),
        )
        .await;

    // Every reporter is gone once the service returns
    let _ = printer.await;

    let summary = result.context("Watch failed")?;
    println!(
        "{} {} events observed, {} pending entries dropped",
        "stopped:".dimmed(),
        summary.events,
        summary.pending
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        args: WatchArgs,
    }

    fn args() -> WatchArgs {
        WatchArgs {
            paths: vec![PathBuf::from("/tmp")],
            delay: None,
            tick: None,
            policy_cmd: None,
            policy_arg: Vec::new(),
            policy_monotonic: false,
            recursive: false,
            keep_going: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut args = args();
        args.delay = Some(30);
        args.tick = Some(2);
        args.keep_going = true;
        args.recursive = true;

        let config = args.apply(SystemConfig::default()).unwrap();
        assert_eq!(config.purge.delay_secs, 30);
        assert_eq!(config.purge.tick_secs, 2);
        assert_eq!(config.purge.on_fs_error, FailureMode::Skip);
        assert!(config.purge.recursive);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = SystemConfig::default();
        config.purge.delay_secs = 99;

        let applied = args().apply(config.clone()).unwrap();
        assert_eq!(applied, config);
    }

    #[test]
    fn test_policy_command_flag() {
        let mut args = args();
        args.policy_cmd = Some(PathBuf::from("/usr/local/bin/purge-policy"));
        args.policy_arg = vec!["--strict".to_string()];
        args.policy_monotonic = true;

        let config = args.apply(SystemConfig::default()).unwrap();
        assert!(config.policy.monotonic);
        assert_eq!(
            config.policy.command,
            Some(PathBuf::from("/usr/local/bin/purge-policy"))
        );
        assert_eq!(config.policy.args, vec!["--strict".to_string()]);
    }

    #[test]
    fn test_delay_conflicts_with_policy_command() {
        let parsed = Cli::try_parse_from([
            "quiesce",
            "--delay",
            "5",
            "--policy-cmd",
            "/usr/local/bin/purge-policy",
            "/tmp",
        ]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from(["quiesce", "--policy-monotonic", "/tmp"]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "quiesce",
            "--policy-cmd",
            "/usr/local/bin/purge-policy",
            "--policy-monotonic",
            "/tmp",
        ])
        .unwrap();
        assert!(parsed.args.policy_monotonic);
    }

    #[test]
    fn test_invalid_flag_rejected() {
        let mut args = args();
        args.tick = Some(0);
        assert!(args.apply(SystemConfig::default()).is_err());
    }
}
