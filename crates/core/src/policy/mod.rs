//! Purge policies
//!
//! A policy decides whether a pending entry is eligible for purging at a
//! given moment. Outcomes are tri-state: anything other than an explicit
//! `Allow` keeps the file on disk.

pub mod command;
pub mod threshold;

pub use command::CommandPolicy;
pub use threshold::QuiescencePolicy;

use std::fmt;
use std::path::Path;
use std::time::SystemTime;
use thiserror::Error;

/// Why a policy could not produce a decision
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The policy failed to run or produced unreadable output
    #[error("policy evaluation failed: {0}")]
    Evaluation(String),

    /// The policy ran but produced no decision
    #[error("policy result is undefined")]
    Undefined,

    /// The policy produced a decision of the wrong type
    #[error("policy returned {found} where a boolean was expected")]
    UnexpectedType {
        /// Kind of value that was returned
        found: String,
    },
}

/// Result of evaluating a policy for one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Entry may be purged
    Allow,
    /// Entry must stay queued
    Deny,
    /// No decision could be made; treated as `Deny`
    Error(PolicyError),
}

impl PolicyOutcome {
    /// Fail-safe fold: only an explicit `Allow` permits purging
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyOutcome::Allow)
    }
}

impl From<bool> for PolicyOutcome {
    fn from(allow: bool) -> Self {
        if allow {
            PolicyOutcome::Allow
        } else {
            PolicyOutcome::Deny
        }
    }
}

/// Purge-eligibility predicate
pub trait PolicyEngine: Send + Sync + fmt::Debug {
    /// Decide whether `path`, last observed changing at `observed_at`,
    /// may be purged at `now`
    fn evaluate(&self, path: &Path, observed_at: SystemTime, now: SystemTime) -> PolicyOutcome;

    /// True if the policy never denies an older entry while allowing a
    /// younger one
    ///
    /// Sweeps stop at the first denial only for monotonic policies; all
    /// other policies get a full scan of the queue.
    fn is_monotonic(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_allow_is_allowed() {
        assert!(PolicyOutcome::Allow.is_allowed());
        assert!(!PolicyOutcome::Deny.is_allowed());
        assert!(!PolicyOutcome::Error(PolicyError::Undefined).is_allowed());
        assert!(!PolicyOutcome::Error(PolicyError::Evaluation("boom".into())).is_allowed());
        assert!(!PolicyOutcome::Error(PolicyError::UnexpectedType {
            found: "string".into()
        })
        .is_allowed());
    }

    #[test]
    fn test_outcome_from_bool() {
        assert_eq!(PolicyOutcome::from(true), PolicyOutcome::Allow);
        assert_eq!(PolicyOutcome::from(false), PolicyOutcome::Deny);
    }

    #[test]
    fn test_error_messages() {
        let err = PolicyError::UnexpectedType {
            found: "number".into(),
        };
        assert_eq!(
            err.to_string(),
            "policy returned number where a boolean was expected"
        );
        assert_eq!(PolicyError::Undefined.to_string(), "policy result is undefined");
    }
}
