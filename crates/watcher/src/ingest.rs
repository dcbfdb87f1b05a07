//! Event ingestion
//!
//! Every change notification, whatever its kind, becomes a pending purge
//! stamped with the ingestion time, followed by an immediate purge pass.

use crate::activity::{Activity, Reporter};
use crate::error::WatchError;
use crate::source::{EventSource, SourceItem};
use crate::worker::PurgeHandle;
use quiesce_core::PendingPurge;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Bridges an event source into the purge worker
pub struct EventIngestor<S> {
    source: S,
    handle: PurgeHandle,
    reporter: Reporter,
    seq: u64,
}

impl<S: EventSource> EventIngestor<S> {
    /// Create an ingestor reading from `source`
    pub fn new(source: S, handle: PurgeHandle, reporter: Reporter) -> Self {
        Self {
            source,
            handle,
            reporter,
            seq: 0,
        }
    }

    /// Ingest until the source closes
    ///
    /// Source errors are logged and skipped. Returns the number of events
    /// ingested, or `WorkerStopped` if the purge worker went away first.
    pub async fn run(mut self) -> Result<u64, WatchError> {
        while let Some(item) = self.source.next().await {
            match item {
                SourceItem::Event(event) => {
                    self.seq += 1;
                    debug!("Event {}: {}", self.seq, event);

                    let entry = PendingPurge::new(event.path.clone(), SystemTime::now());
                    self.reporter.emit(Activity::Observed {
                        seq: self.seq,
                        event,
                    });

                    self.handle.push(entry).await?;
                    self.handle.evaluate().await?;
                }
                SourceItem::Error(message) => {
                    warn!("Event source error: {}", message);
                    self.reporter.emit(Activity::SourceError { message });
                }
            }
        }

        info!("Event source closed after {} events", self.seq);
        if let Err(e) = self.source.close() {
            warn!("Failed to close event source: {}", e);
        }
        Ok(self.seq)
    }
}
