//! Fixed quiescence threshold policy

use super::{PolicyEngine, PolicyOutcome};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Default quiescence delay
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Allows a purge once an entry is at least `delay` old
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuiescencePolicy {
    delay: Duration,
}

impl QuiescencePolicy {
    /// Create a policy with the given quiescence delay
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Configured quiescence delay
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for QuiescencePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl PolicyEngine for QuiescencePolicy {
    fn evaluate(&self, _path: &Path, observed_at: SystemTime, now: SystemTime) -> PolicyOutcome {
        let age = now.duration_since(observed_at).unwrap_or(Duration::ZERO);
        PolicyOutcome::from(age >= self.delay)
    }

    fn is_monotonic(&self) -> bool {
        true
    }
}
