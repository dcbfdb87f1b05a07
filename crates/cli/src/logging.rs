//! Tracing setup

use crate::system_config::LogConfig;
use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global subscriber
///
/// Logs go to stderr, and additionally to a daily-rolling file when
/// `log.directory` is set. Keep the returned guard alive until exit so the
/// file writer flushes.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let level = LevelFilter::from_level(config.level()?);
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match &config.directory {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "quiesce.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::registry()
                .with(level)
                .with(stderr)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry().with(level).with(stderr).init();
            Ok(None)
        }
    }
}
