//! Watch service
//!
//! Runs the three moving parts of a watch: the event ingestor, the periodic
//! ticker, and the queue-owning purge worker. The service ends when the
//! event source closes, the shutdown future resolves, or the worker halts
//! on a filesystem failure.

use crate::activity::{Activity, Reporter};
use crate::error::WatchError;
use crate::evaluator::{FailureMode, PurgeEvaluator};
use crate::ingest::EventIngestor;
use crate::reconcile::FileReconciler;
use crate::source::EventSource;
use crate::worker::{PurgeWorker, WorkerResult, DEFAULT_COMMAND_BUFFER};
use quiesce_core::{DelayQueue, PolicyEngine};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot::error::RecvError;
use tracing::{info, warn};

/// Default interval between periodic purge passes
pub const DEFAULT_TICK: Duration = Duration::from_secs(5);

/// Tuning for a watch service
#[derive(Debug, Clone)]
pub struct PurgeSettings {
    /// Interval between periodic purge passes
    pub tick: Duration,
    /// Reaction to unexpected filesystem failures
    pub failure_mode: FailureMode,
    /// Capacity of the worker's command channel
    pub command_buffer: usize,
}

impl Default for PurgeSettings {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            failure_mode: FailureMode::Halt,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

/// How a watch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Events ingested before shutdown
    pub events: u64,
    /// Entries still pending when the worker stopped
    pub pending: usize,
}

/// Watch service
pub struct PurgeService {
    policy: Arc<dyn PolicyEngine>,
    settings: PurgeSettings,
    reporter: Reporter,
}

impl PurgeService {
    /// Create a service that purges according to `policy`
    pub fn new(policy: Arc<dyn PolicyEngine>, settings: PurgeSettings) -> Self {
        Self {
            policy,
            settings,
            reporter: Reporter::silent(),
        }
    }

    /// Send activity records to `reporter`
    pub fn with_reporter(mut self, reporter: Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Watch `paths` until the source closes or `shutdown` resolves
    ///
    /// `open_source` is only called once at least one path was given and
    /// the tick is non-zero. Every path must register successfully before
    /// any event is ingested.
    pub async fn run<S, F, Sd>(
        self,
        paths: Vec<PathBuf>,
        open_source: F,
        shutdown: Sd,
    ) -> Result<RunSummary, WatchError>
    where
        S: EventSource + 'static,
        F: FnOnce() -> Result<S, WatchError>,
        Sd: Future<Output = ()>,
    {
        if paths.is_empty() {
            return Err(WatchError::NoPaths);
        }
        if self.settings.tick.is_zero() {
            return Err(WatchError::Setup("purge tick must be non-zero".to_string()));
        }

        let mut source = open_source()?;
        for path in &paths {
            source.add(path)?;
        }

        let evaluator = PurgeEvaluator::new(
            self.policy,
            FileReconciler::new(),
            self.settings.failure_mode,
            self.reporter.clone(),
        );
        let (worker, handle) = PurgeWorker::new(evaluator, self.settings.command_buffer);
        let mut worker_task = worker.spawn()?;
        let ticker = handle.spawn_ticker(self.settings.tick);

        info!("Watching {} path(s), sweeping every {:?}", paths.len(), self.settings.tick);
        self.reporter.emit(Activity::Ready { paths });

        let mut ingest =
            Box::pin(EventIngestor::new(source, handle.clone(), self.reporter.clone()).run());
        tokio::pin!(shutdown);

        let mut events = 0;
        let mut finished = None;
        tokio::select! {
            joined = &mut worker_task => finished = Some(joined),
            ingested = &mut ingest => match ingested {
                Ok(count) => events = count,
                // The worker result carries the real cause
                Err(WatchError::WorkerStopped) => {}
                Err(e) => warn!("Ingestion stopped: {}", e),
            },
            _ = &mut shutdown => info!("Shutdown requested"),
        }

        // Release every handle so the worker drains and exits
        drop(ingest);
        ticker.abort();
        let _ = ticker.await;
        drop(handle);

        let joined = match finished {
            Some(joined) => joined,
            None => worker_task.await,
        };
        let remaining = settle_worker(joined)?;

        Ok(RunSummary {
            events,
            pending: remaining.len(),
        })
    }
}

fn settle_worker(joined: Result<WorkerResult, RecvError>) -> Result<DelayQueue, WatchError> {
    match joined {
        Ok(Ok(queue)) => Ok(queue),
        Ok(Err(e)) => Err(WatchError::Reconcile(e)),
        Err(_) => Err(WatchError::WorkerFailed(
            "purge worker exited without a result".to_string(),
        )),
    }
}
