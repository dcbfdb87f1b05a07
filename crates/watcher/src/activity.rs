//! Activity reporting
//!
//! The engine reports what it observes and does as typed `Activity`
//! records. Front ends render them; tests assert on them.

use crate::source::WatchEvent;
use quiesce_core::PolicyOutcome;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::sync::mpsc;

/// Something the watch service observed or did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activity {
    /// All paths are registered and events are being ingested
    Ready { paths: Vec<PathBuf> },
    /// A change notification was ingested
    Observed { seq: u64, event: WatchEvent },
    /// The event source reported an error
    SourceError { message: String },
    /// A purge pass started over a non-empty queue
    PassStarted { queued: usize },
    /// The policy was consulted for an entry
    Decision {
        path: PathBuf,
        observed_at: SystemTime,
        outcome: PolicyOutcome,
    },
    /// A file was deleted
    Removed { path: PathBuf, observed_at: SystemTime },
    /// A file changed after it was observed and got a new window
    Requeued {
        path: PathBuf,
        observed_at: SystemTime,
        requeued_at: SystemTime,
    },
    /// The path was already gone
    Vanished { path: PathBuf },
    /// Reconciling the path failed
    Failed { path: PathBuf, message: String },
}

/// Cloneable activity sink
///
/// A silent reporter drops everything.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    tx: Option<mpsc::UnboundedSender<Activity>>,
}

impl Reporter {
    /// Reporter that forwards activity to `tx`
    pub fn new(tx: mpsc::UnboundedSender<Activity>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Reporter paired with its receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Activity>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Reporter that discards activity
    pub fn silent() -> Self {
        Self::default()
    }

    /// Send one activity record; a closed receiver is ignored
    pub fn emit(&self, activity: Activity) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(activity);
        }
    }
}
