//! Error types for the watch service

use crate::reconcile::ReconcileError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the watch service or prevent it from starting
#[derive(Debug, Error)]
pub enum WatchError {
    /// No paths were given
    #[error("must specify at least one path to watch")]
    NoPaths,

    /// The event source could not be created
    #[error("creating a new watcher: {0}")]
    Setup(String),

    /// A path could not be registered with the event source
    #[error("{path:?}: {message}")]
    AddPath {
        /// Path that failed to register
        path: PathBuf,
        /// Backend error message
        message: String,
    },

    /// The event source was already closed
    #[error("event source is closed")]
    SourceClosed,

    /// An unexpected filesystem failure halted purging
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// The purge worker is no longer accepting commands
    #[error("purge worker stopped")]
    WorkerStopped,

    /// The purge worker panicked or was cancelled
    #[error("purge worker failed: {0}")]
    WorkerFailed(String),
}

impl WatchError {
    /// True for errors caused by how the service was invoked
    pub fn is_usage(&self) -> bool {
        matches!(self, WatchError::NoPaths)
    }
}
