//! Pending purge observations

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// One observation of a path changing
///
/// Several entries may exist for the same path at once. Rapid successive
/// edits each produce their own entry, and the reconciler sorts out which
/// of them are stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPurge {
    /// Path that changed
    pub path: PathBuf,
    /// When the change was observed
    pub observed_at: SystemTime,
}

impl PendingPurge {
    /// Create a new entry for `path` observed at `observed_at`
    pub fn new(path: impl Into<PathBuf>, observed_at: SystemTime) -> Self {
        Self {
            path: path.into(),
            observed_at,
        }
    }

    /// Path this entry refers to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time elapsed between the observation and `now`
    ///
    /// Observations stamped after `now` (clock adjustments) count as age zero.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.observed_at).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_is_elapsed_time() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let entry = PendingPurge::new("/tmp/a.txt", t0);

        assert_eq!(entry.age(t0), Duration::ZERO);
        assert_eq!(entry.age(t0 + Duration::from_secs(7)), Duration::from_secs(7));
    }

    #[test]
    fn test_age_saturates_for_future_observation() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let entry = PendingPurge::new("/tmp/a.txt", t0 + Duration::from_secs(5));

        assert_eq!(entry.age(t0), Duration::ZERO);
    }
}
