//! Queue-owning purge worker
//!
//! The worker is the only owner of the pending-purge queue. Everything else
//! talks to it through a `PurgeHandle`, which serializes pushes, sweeps and
//! inspections into one command stream. The worker lives on its own
//! thread for the whole watch, so reconciliation I/O and policy programs
//! never stall the async runtime. Commands buffer in the channel while a
//! sweep is in progress.

use crate::error::WatchError;
use crate::evaluator::PurgeEvaluator;
use crate::reconcile::ReconcileError;
use quiesce_core::{DelayQueue, PendingPurge};
use std::thread;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Default command channel capacity
pub const DEFAULT_COMMAND_BUFFER: usize = 1024;

/// Shortest ticker period; `tokio::time::interval` rejects zero
const MIN_TICK: Duration = Duration::from_millis(1);

/// What a worker leaves behind: the entries still queued, or the failure
/// that halted it
pub type WorkerResult = Result<DelayQueue, ReconcileError>;

/// Request to the purge worker
#[derive(Debug)]
pub enum Command {
    /// Queue an entry
    Push(PendingPurge),
    /// Run a purge pass now
    Evaluate,
    /// Reply with the queued entries, earliest first
    Snapshot(oneshot::Sender<Vec<PendingPurge>>),
}

/// Sending side of the worker's command stream
#[derive(Debug, Clone)]
pub struct PurgeHandle {
    tx: mpsc::Sender<Command>,
}

impl PurgeHandle {
    /// Queue an entry
    pub async fn push(&self, entry: PendingPurge) -> Result<(), WatchError> {
        self.send(Command::Push(entry)).await
    }

    /// Request a purge pass
    pub async fn evaluate(&self) -> Result<(), WatchError> {
        self.send(Command::Evaluate).await
    }

    /// Queued entries, earliest first
    pub async fn snapshot(&self) -> Result<Vec<PendingPurge>, WatchError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        rx.await.map_err(|_| WatchError::WorkerStopped)
    }

    /// Request a purge pass every `period`, starting immediately
    ///
    /// Periods below one millisecond are raised to it. The ticker stops on
    /// its own once the worker is gone.
    pub fn spawn_ticker(&self, period: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        let period = period.max(MIN_TICK);
        tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                if handle.evaluate().await.is_err() {
                    debug!("Purge worker gone, stopping ticker");
                    break;
                }
            }
        })
    }

    async fn send(&self, command: Command) -> Result<(), WatchError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| WatchError::WorkerStopped)
    }
}

/// Owner of the pending-purge queue
#[derive(Debug)]
pub struct PurgeWorker {
    queue: DelayQueue,
    evaluator: PurgeEvaluator,
    commands: mpsc::Receiver<Command>,
}

impl PurgeWorker {
    /// Create a worker and the handle that feeds it
    pub fn new(evaluator: PurgeEvaluator, buffer: usize) -> (Self, PurgeHandle) {
        let (tx, commands) = mpsc::channel(buffer.max(1));
        let worker = Self {
            queue: DelayQueue::new(),
            evaluator,
            commands,
        };
        (worker, PurgeHandle { tx })
    }

    /// Process commands until every handle is dropped
    ///
    /// Blocks the calling thread. Returns the entries still queued, or the
    /// first reconciliation failure that halted purging.
    pub fn run(mut self) -> WorkerResult {
        while let Some(command) = self.commands.blocking_recv() {
            match command {
                Command::Push(entry) => self.queue.push(entry),
                Command::Evaluate => {
                    self.evaluator.sweep(&mut self.queue, SystemTime::now())?;
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.queue.snapshot());
                }
            }
        }

        info!("Purge worker stopped with {} pending entries", self.queue.len());
        Ok(self.queue)
    }

    /// Run on a dedicated `purge-worker` thread
    ///
    /// The receiver resolves with the worker's result. It errors if the
    /// worker panicked.
    pub fn spawn(self) -> Result<oneshot::Receiver<WorkerResult>, WatchError> {
        let (done, result) = oneshot::channel();
        thread::Builder::new()
            .name("purge-worker".to_string())
            .spawn(move || {
                let _ = done.send(self.run());
            })
            .map_err(|e| WatchError::Setup(format!("spawning purge worker: {}", e)))?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Reporter;
    use crate::evaluator::FailureMode;
    use crate::reconcile::FileReconciler;
    use quiesce_core::QuiescencePolicy;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn spawn_worker(
        delay: Duration,
        mode: FailureMode,
    ) -> (PurgeHandle, oneshot::Receiver<WorkerResult>) {
        let evaluator = PurgeEvaluator::new(
            Arc::new(QuiescencePolicy::new(delay)),
            FileReconciler::new(),
            mode,
            Reporter::silent(),
        );
        let (worker, handle) = PurgeWorker::new(evaluator, 16);
        (handle, worker.spawn().unwrap())
    }

    #[tokio::test]
    async fn test_push_and_snapshot() {
        let (handle, task) = spawn_worker(Duration::from_secs(60), FailureMode::Halt);
        let t0 = SystemTime::now();

        handle.push(PendingPurge::new("/tmp/b", t0 + Duration::from_secs(2))).await.unwrap();
        handle.push(PendingPurge::new("/tmp/a", t0)).await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].path, std::path::PathBuf::from("/tmp/a"));

        drop(handle);
        let remaining = task.await.unwrap().unwrap();
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test]
    async fn test_evaluate_purges_quiet_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"content").unwrap();

        let (handle, task) = spawn_worker(Duration::ZERO, FailureMode::Halt);
        handle.push(PendingPurge::new(&file, SystemTime::now())).await.unwrap();
        handle.evaluate().await.unwrap();

        // Snapshot is processed after the sweep
        assert!(handle.snapshot().await.unwrap().is_empty());
        assert!(!file.exists());

        drop(handle);
        assert!(task.await.unwrap().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fatal_failure_stops_worker() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, b"content").unwrap();

        let (handle, task) = spawn_worker(Duration::ZERO, FailureMode::Halt);
        handle.push(PendingPurge::new(file.join("child"), SystemTime::now())).await.unwrap();
        handle.evaluate().await.unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(ReconcileError::Stat { .. })));
        assert!(matches!(
            handle.evaluate().await,
            Err(WatchError::WorkerStopped)
        ));
    }

    #[tokio::test]
    async fn test_ticker_drives_sweeps() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"content").unwrap();

        let (handle, task) = spawn_worker(Duration::from_millis(50), FailureMode::Halt);
        handle.push(PendingPurge::new(&file, SystemTime::now())).await.unwrap();
        let ticker = handle.spawn_ticker(Duration::from_millis(20));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while file.exists() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!file.exists());

        ticker.abort();
        let _ = ticker.await;
        drop(handle);
        assert!(task.await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_period_ticker_still_sweeps() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("a.txt");
        fs::write(&file, b"content").unwrap();

        let (handle, task) = spawn_worker(Duration::ZERO, FailureMode::Halt);
        handle.push(PendingPurge::new(&file, SystemTime::now())).await.unwrap();
        let ticker = handle.spawn_ticker(Duration::ZERO);

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while file.exists() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!file.exists());
        assert!(!ticker.is_finished());

        ticker.abort();
        let _ = ticker.await;
        drop(handle);
        assert!(task.await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_worker_runs_on_named_thread() {
        #[derive(Debug)]
        struct ThreadNamePolicy(std::sync::Mutex<Option<String>>);

        impl quiesce_core::PolicyEngine for ThreadNamePolicy {
            fn evaluate(
                &self,
                _path: &std::path::Path,
                _observed_at: SystemTime,
                _now: SystemTime,
            ) -> quiesce_core::PolicyOutcome {
                *self.0.lock().unwrap() = thread::current().name().map(str::to_string);
                quiesce_core::PolicyOutcome::Deny
            }
        }

        let policy = Arc::new(ThreadNamePolicy(std::sync::Mutex::new(None)));
        let evaluator = PurgeEvaluator::new(
            policy.clone(),
            FileReconciler::new(),
            FailureMode::Halt,
            Reporter::silent(),
        );
        let (worker, handle) = PurgeWorker::new(evaluator, 16);
        let task = worker.spawn().unwrap();

        handle.push(PendingPurge::new("/tmp/a", SystemTime::now())).await.unwrap();
        handle.evaluate().await.unwrap();
        handle.snapshot().await.unwrap();

        assert_eq!(policy.0.lock().unwrap().as_deref(), Some("purge-worker"));
        drop(handle);
        assert_eq!(task.await.unwrap().unwrap().len(), 1);
    }
}
