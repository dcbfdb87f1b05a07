//! Reconciliation against the live filesystem
//!
//! An entry that the policy approved may be stale by the time it is
//! processed: the file may already be gone, or it may have been written
//! again through a coalesced or missed notification. The reconciler
//! re-stats the path before deleting anything.

use quiesce_core::PendingPurge;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info};

/// Unexpected filesystem failure while reconciling an entry
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Stat failed for a reason other than the path not existing
    #[error("stat {path:?}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The path could not be deleted
    #[error("remove {path:?}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ReconcileError {
    /// Path the failure refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            ReconcileError::Stat { path, .. } | ReconcileError::Remove { path, .. } => path,
        }
    }
}

/// What happened to a reconciled entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The path was deleted
    Removed,
    /// The path changed after the entry was observed; this fresh entry
    /// replaces it
    Requeued(PendingPurge),
    /// The path no longer exists
    Vanished,
}

/// Validates purge-eligible entries against the filesystem and acts on them
#[derive(Debug, Clone, Copy, Default)]
pub struct FileReconciler;

impl FileReconciler {
    /// Create a new reconciler
    pub fn new() -> Self {
        Self
    }

    /// Delete `entry.path` unless it changed after `entry.observed_at`
    ///
    /// `now` stamps the replacement entry when the file changed.
    pub fn reconcile(
        &self,
        entry: &PendingPurge,
        now: SystemTime,
    ) -> Result<Reconciliation, ReconcileError> {
        let path = &entry.path;

        let metadata = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            // Duplicate entries make this an expected race
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{} already gone", path.display());
                return Ok(Reconciliation::Vanished);
            }
            Err(source) => {
                return Err(ReconcileError::Stat {
                    path: path.clone(),
                    source,
                })
            }
        };

        let mtime = metadata.modified().map_err(|source| ReconcileError::Stat {
            path: path.clone(),
            source,
        })?;

        if mtime > entry.observed_at {
            debug!("{} modified since observation, requeueing", path.display());
            return Ok(Reconciliation::Requeued(PendingPurge::new(path.clone(), now)));
        }

        let removed = if metadata.is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };

        match removed {
            Ok(()) => {
                info!("Removed {}", path.display());
                Ok(Reconciliation::Removed)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Reconciliation::Vanished),
            Err(source) => Err(ReconcileError::Remove {
                path: path.clone(),
                source,
            }),
        }
    }
}
