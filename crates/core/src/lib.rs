//! Core purge engine types for Quiesce
//!
//! This crate provides:
//! - `PendingPurge` observations of changed paths
//! - `DelayQueue`, the time-ordered pending-purge queue
//! - The `PolicyEngine` contract with its fail-safe outcome type
//! - Built-in policies (quiescence threshold, external command)

pub mod entry;
pub mod policy;
pub mod queue;

// Re-exports
pub use entry::PendingPurge;
pub use policy::{CommandPolicy, PolicyEngine, PolicyError, PolicyOutcome, QuiescencePolicy};
pub use queue::DelayQueue;
