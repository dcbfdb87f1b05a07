//! File system watching and purging for Quiesce
//!
//! This crate wires the purge engine to a live event source:
//! - Event sources (notify-backed, or anything implementing `EventSource`)
//! - Event ingestion with per-event sequence numbers
//! - Purge sweeps against a pluggable policy
//! - Reconciliation against the live filesystem before deleting
//! - A single worker that owns the pending-purge queue

pub mod activity;
pub mod error;
pub mod evaluator;
pub mod ingest;
pub mod reconcile;
pub mod service;
pub mod source;
pub mod worker;

// Re-exports
pub use activity::{Activity, Reporter};
pub use error::WatchError;
pub use evaluator::{FailureMode, PurgeEvaluator, SweepReport};
pub use ingest::EventIngestor;
pub use reconcile::{FileReconciler, ReconcileError, Reconciliation};
pub use service::{PurgeService, PurgeSettings, RunSummary};
pub use source::{EventKind, EventSource, NotifySource, SourceItem, WatchEvent};
pub use worker::{Command, PurgeHandle, PurgeWorker, WorkerResult};
