//! System configuration
//!
//! Loaded from `<config_dir>/quiesce/config.toml` unless another file is
//! given. A missing file means defaults.

use anyhow::{Context, Result};
use quiesce_core::{CommandPolicy, PolicyEngine, QuiescencePolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use watcher::{FailureMode, PurgeSettings};

/// Full configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub purge: PurgeConfig,
    pub policy: PolicyConfig,
    pub log: LogConfig,
}

/// `[purge]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurgeConfig {
    /// Quiescence delay before a path may be purged
    pub delay_secs: u64,
    /// Interval between periodic purge passes
    pub tick_secs: u64,
    /// Reaction to unexpected stat/remove failures
    pub on_fs_error: FailureMode,
    /// Watch directories recursively
    pub recursive: bool,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            delay_secs: 10,
            tick_secs: 5,
            on_fs_error: FailureMode::Halt,
            recursive: false,
        }
    }
}

/// `[policy]` section
///
/// With no command, the quiescence threshold policy is used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<PathBuf>,
    pub args: Vec<String>,
    /// The command never allows an entry while denying an older one
    pub monotonic: bool,
}

/// `[log]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            directory: None,
        }
    }
}

impl LogConfig {
    /// Parsed log level
    pub fn level(&self) -> Result<tracing::Level> {
        self.level.parse().map_err(|_| {
            anyhow::anyhow!(
                "log.level must be one of error, warn, info, debug, trace (got '{}')",
                self.level
            )
        })
    }
}

impl SystemConfig {
    /// Check every value is within its valid range
    pub fn validate(&self) -> Result<()> {
        if self.purge.delay_secs > 604_800 {
            anyhow::bail!(
                "purge.delay_secs must be between 0 and 604800 (got {})",
                self.purge.delay_secs
            );
        }
        if !(1..=3600).contains(&self.purge.tick_secs) {
            anyhow::bail!(
                "purge.tick_secs must be between 1 and 3600 (got {})",
                self.purge.tick_secs
            );
        }
        if let Some(command) = &self.policy.command {
            if command.as_os_str().is_empty() {
                anyhow::bail!("policy.command must not be empty");
            }
        }
        self.log.level()?;
        Ok(())
    }

    /// Policy described by this configuration
    pub fn policy(&self) -> Arc<dyn PolicyEngine> {
        match &self.policy.command {
            Some(command) => Arc::new(
                CommandPolicy::new(command, self.policy.args.clone())
                    .with_monotonic(self.policy.monotonic),
            ),
            None => Arc::new(QuiescencePolicy::new(Duration::from_secs(self.purge.delay_secs))),
        }
    }

    /// Service settings described by this configuration
    pub fn settings(&self) -> PurgeSettings {
        PurgeSettings {
            tick: Duration::from_secs(self.purge.tick_secs),
            failure_mode: self.purge.on_fs_error,
            ..PurgeSettings::default()
        }
    }
}

/// Default configuration file location
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quiesce").join("config.toml"))
}

/// Load configuration from `path`, or from the default location
pub fn load(path: Option<&Path>) -> Result<SystemConfig> {
    match path {
        Some(path) => load_from(path),
        None => match config_file_path() {
            Some(path) if path.exists() => load_from(&path),
            _ => Ok(SystemConfig::default()),
        },
    }
}

/// Load and validate a configuration file
pub fn load_from(path: &Path) -> Result<SystemConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Write `config` to `path`, creating parent directories
pub fn save(config: &SystemConfig, path: &Path) -> Result<()> {
    config.validate().context("Refusing to save invalid configuration")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let contents = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write config file {}", path.display()))
}

/// Create the default configuration file if it does not exist yet
///
/// Returns the file location.
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save(&SystemConfig::default(), &path)?;
    }
    Ok(path)
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# Quiesce configuration

[purge]
# Seconds a path must stay unmodified before it may be purged (0-604800)
delay_secs = 10
# Seconds between periodic purge passes (1-3600)
tick_secs = 5
# "halt" stops on unexpected stat/remove failures, "skip" drops the entry
on_fs_error = "halt"
# Watch directories recursively
recursive = false

[policy]
# External rule program; reads {"path", "time", "now"} as JSON on stdin and
# prints {"allow": true|false}. Replaces the delay_secs threshold.
# command = "/usr/local/bin/purge-policy"
# args = ["--strict"]
# Set when the rule never allows a path while denying an older one (for
# example an age threshold); purge passes then stop at the first denial.
monotonic = false

[log]
# error | warn | info | debug | trace
level = "warn"
# Also write daily-rotated logs here
# directory = "/var/log/quiesce"
"#
}
