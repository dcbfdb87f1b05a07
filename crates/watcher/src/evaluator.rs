//! Purge sweeps
//!
//! A sweep drains purge-eligible entries from the front of the queue. For
//! monotonic policies it stops at the first denied entry: the queue is
//! ordered by observation time, so nothing behind a denied entry can be
//! eligible either. Other policies get a full scan that skips denied
//! entries. A policy error stops any pass at the failing entry.

use crate::activity::{Activity, Reporter};
use crate::reconcile::{FileReconciler, ReconcileError, Reconciliation};
use quiesce_core::{DelayQueue, PendingPurge, PolicyEngine, PolicyOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, warn};

/// What to do when reconciling an entry fails unexpectedly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Stop the sweep and the service
    #[default]
    Halt,
    /// Log the failure, drop the entry, keep going
    Skip,
}

/// Counters for one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries the policy was consulted for
    pub examined: usize,
    /// Entries the policy denied (or failed to decide)
    pub denied: usize,
    /// Files deleted
    pub removed: usize,
    /// Files that changed since observation and were requeued
    pub requeued: usize,
    /// Entries whose path was already gone
    pub vanished: usize,
    /// Entries dropped after a filesystem failure
    pub failed: usize,
}

/// A policy decision as seen by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Allow,
    Deny,
    Failed,
}

/// Sweeps the queue against a policy
#[derive(Debug, Clone)]
pub struct PurgeEvaluator {
    policy: Arc<dyn PolicyEngine>,
    reconciler: FileReconciler,
    failure_mode: FailureMode,
    reporter: Reporter,
}

impl PurgeEvaluator {
    /// Create an evaluator for `policy`
    pub fn new(
        policy: Arc<dyn PolicyEngine>,
        reconciler: FileReconciler,
        failure_mode: FailureMode,
        reporter: Reporter,
    ) -> Self {
        Self {
            policy,
            reconciler,
            failure_mode,
            reporter,
        }
    }

    /// Run one purge pass at `now`
    ///
    /// Entries requeued during the pass are pushed back once it finishes, so
    /// a pass never reconsiders an entry it created. Sweeping an empty queue
    /// does nothing.
    pub fn sweep(
        &self,
        queue: &mut DelayQueue,
        now: SystemTime,
    ) -> Result<SweepReport, ReconcileError> {
        let mut report = SweepReport::default();
        if queue.is_empty() {
            return Ok(report);
        }

        self.reporter.emit(Activity::PassStarted {
            queued: queue.len(),
        });

        let mut deferred = Vec::new();
        let result = if self.policy.is_monotonic() {
            self.sweep_front(queue, now, &mut report, &mut deferred)
        } else {
            self.sweep_all(queue, now, &mut report, &mut deferred)
        };
        queue.extend(deferred);

        result?;
        if report.examined > report.denied {
            debug!("Purge pass finished: {:?}", report);
        }
        Ok(report)
    }

    /// Pop from the front until the policy denies the minimum
    fn sweep_front(
        &self,
        queue: &mut DelayQueue,
        now: SystemTime,
        report: &mut SweepReport,
        deferred: &mut Vec<PendingPurge>,
    ) -> Result<(), ReconcileError> {
        while let Some(candidate) = queue.peek_min() {
            if self.consult(candidate, now, report) != Verdict::Allow {
                break;
            }
            if let Some(entry) = queue.pop_min() {
                self.settle(entry, now, report, deferred)?;
            }
        }
        Ok(())
    }

    /// Evaluate every queued entry, keeping the denied ones
    ///
    /// Stops at the first policy error, leaving the rest untouched.
    fn sweep_all(
        &self,
        queue: &mut DelayQueue,
        now: SystemTime,
        report: &mut SweepReport,
        deferred: &mut Vec<PendingPurge>,
    ) -> Result<(), ReconcileError> {
        let mut pending = std::iter::from_fn(|| queue.pop_min())
            .collect::<Vec<_>>()
            .into_iter();

        while let Some(entry) = pending.next() {
            match self.consult(&entry, now, report) {
                Verdict::Allow => {}
                Verdict::Deny => {
                    deferred.push(entry);
                    continue;
                }
                Verdict::Failed => {
                    deferred.push(entry);
                    deferred.extend(pending);
                    return Ok(());
                }
            }
            if let Err(e) = self.settle(entry, now, report, deferred) {
                deferred.extend(pending);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Ask the policy about one entry; anything but `Allow` is a denial
    fn consult(&self, entry: &PendingPurge, now: SystemTime, report: &mut SweepReport) -> Verdict {
        let outcome = self.policy.evaluate(&entry.path, entry.observed_at, now);
        report.examined += 1;

        let verdict = match &outcome {
            PolicyOutcome::Allow => Verdict::Allow,
            PolicyOutcome::Deny => Verdict::Deny,
            PolicyOutcome::Error(e) => {
                warn!("Policy failed for {}, treating as deny: {}", entry.path.display(), e);
                Verdict::Failed
            }
        };
        if verdict != Verdict::Allow {
            report.denied += 1;
        }

        self.reporter.emit(Activity::Decision {
            path: entry.path.clone(),
            observed_at: entry.observed_at,
            outcome,
        });
        verdict
    }

    /// Reconcile an approved entry and record what happened
    fn settle(
        &self,
        entry: PendingPurge,
        now: SystemTime,
        report: &mut SweepReport,
        deferred: &mut Vec<PendingPurge>,
    ) -> Result<(), ReconcileError> {
        match self.reconciler.reconcile(&entry, now) {
            Ok(Reconciliation::Removed) => {
                report.removed += 1;
                self.reporter.emit(Activity::Removed {
                    path: entry.path,
                    observed_at: entry.observed_at,
                });
            }
            Ok(Reconciliation::Requeued(fresh)) => {
                report.requeued += 1;
                self.reporter.emit(Activity::Requeued {
                    path: entry.path,
                    observed_at: entry.observed_at,
                    requeued_at: fresh.observed_at,
                });
                deferred.push(fresh);
            }
            Ok(Reconciliation::Vanished) => {
                report.vanished += 1;
                self.reporter.emit(Activity::Vanished { path: entry.path });
            }
            Err(e) => {
                self.reporter.emit(Activity::Failed {
                    path: entry.path,
                    message: e.to_string(),
                });
                match self.failure_mode {
                    FailureMode::Halt => {
                        error!("Halting purge: {}", e);
                        return Err(e);
                    }
                    FailureMode::Skip => {
                        warn!("Dropping entry after failure: {}", e);
                        report.failed += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
