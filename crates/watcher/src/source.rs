//! Event sources
//!
//! An event source delivers change notifications and errors on two
//! streams. Closure of either stream ends ingestion.

use crate::error::WatchError;
use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// File system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

impl WatchEvent {
    /// Create an event for `path`
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Split a notify event into one event per affected path
    pub fn from_notify(event: notify::Event) -> Vec<Self> {
        let kind = EventKind::from(&event.kind);
        event
            .paths
            .into_iter()
            .map(|path| Self { path, kind })
            .collect()
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6} {:?}", self.kind, self.path)
    }
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created
    Create,
    /// File contents or metadata modified
    Modify,
    /// File deleted
    Delete,
    /// File renamed
    Rename,
    /// File accessed (e.g. closed after writing)
    Access,
    /// Anything the backend could not classify
    Other,
}

impl From<&notify::EventKind> for EventKind {
    fn from(kind: &notify::EventKind) -> Self {
        use notify::event::ModifyKind;

        match kind {
            notify::EventKind::Create(_) => EventKind::Create,
            notify::EventKind::Modify(ModifyKind::Name(_)) => EventKind::Rename,
            notify::EventKind::Modify(_) => EventKind::Modify,
            notify::EventKind::Remove(_) => EventKind::Delete,
            notify::EventKind::Access(_) => EventKind::Access,
            notify::EventKind::Any | notify::EventKind::Other => EventKind::Other,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EventKind::Create => "CREATE",
            EventKind::Modify => "MODIFY",
            EventKind::Delete => "DELETE",
            EventKind::Rename => "RENAME",
            EventKind::Access => "ACCESS",
            EventKind::Other => "OTHER",
        };
        f.pad(label)
    }
}

/// Item delivered by an event source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceItem {
    /// A change notification
    Event(WatchEvent),
    /// An error reported by the backend
    Error(String),
}

/// Source of change notifications
#[async_trait]
pub trait EventSource: Send {
    /// Start watching `path`
    fn add(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Next notification or error
    ///
    /// Returns `None` once the source is closed.
    async fn next(&mut self) -> Option<SourceItem>;

    /// Stop watching and close both streams
    fn close(&mut self) -> Result<(), WatchError>;
}

/// Event source backed by the platform's recommended notify watcher
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
    mode: RecursiveMode,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    errors: mpsc::UnboundedReceiver<String>,
}

impl NotifySource {
    /// Create a new watcher with no registered paths
    pub fn new(recursive: bool) -> Result<Self, WatchError> {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for event in WatchEvent::from_notify(event) {
                        let _ = event_tx.send(event);
                    }
                }
                Err(e) => {
                    let _ = error_tx.send(e.to_string());
                }
            }
        })
        .map_err(|e| WatchError::Setup(e.to_string()))?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        Ok(Self {
            watcher: Some(watcher),
            mode,
            events,
            errors,
        })
    }
}

#[async_trait]
impl EventSource for NotifySource {
    fn add(&mut self, path: &Path) -> Result<(), WatchError> {
        let watcher = self.watcher.as_mut().ok_or(WatchError::SourceClosed)?;
        watcher
            .watch(path, self.mode)
            .map_err(|e| WatchError::AddPath {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        debug!("Watching {} ({:?})", path.display(), self.mode);
        Ok(())
    }

    async fn next(&mut self) -> Option<SourceItem> {
        tokio::select! {
            event = self.events.recv() => event.map(SourceItem::Event),
            error = self.errors.recv() => error.map(SourceItem::Error),
        }
    }

    fn close(&mut self) -> Result<(), WatchError> {
        // Dropping the watcher drops the handler and with it both senders
        if self.watcher.take().is_some() {
            info!("Closed file watcher");
        }
        Ok(())
    }
}
