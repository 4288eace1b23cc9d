//! In-flight unit bookkeeping.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::types::UnitKey;

/// Live state of one running scan unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScannerProgress {
    /// Account id.
    pub account_id: String,
    /// Account display name.
    pub account_name: String,
    /// Reported region, `global` for global-scope scanners.
    pub region: String,
    /// Scanner label.
    pub scanner: String,
    /// Results found so far.
    pub result_count: usize,
}

/// Registry of in-flight units. Entries exist only while a unit runs.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    running: RwLock<HashMap<UnitKey, ScannerProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a running unit.
    pub fn start(
        &self,
        account_id: &str,
        account_name: &str,
        region: &str,
        scanner: &str,
    ) {
        let key = UnitKey::new(account_id, region, scanner);
        let progress = ScannerProgress {
            account_id: account_id.to_string(),
            account_name: account_name.to_string(),
            region: region.to_string(),
            scanner: scanner.to_string(),
            result_count: 0,
        };
        self.write().insert(key, progress);
    }

    /// Start tracking and hand back a guard that completes the entry when
    /// dropped, on every exit path of the unit.
    pub fn track(
        self: &Arc<Self>,
        account_id: &str,
        account_name: &str,
        region: &str,
        scanner: &str,
    ) -> ProgressGuard {
        self.start(account_id, account_name, region, scanner);
        ProgressGuard {
            tracker: Arc::clone(self),
            key: UnitKey::new(account_id, region, scanner),
        }
    }

    /// Unknown keys are ignored; the unit may already have completed.
    pub fn update_count(
        &self,
        account_id: &str,
        region: &str,
        scanner: &str,
        count: usize,
    ) {
        self.update_key(&UnitKey::new(account_id, region, scanner), count);
    }

    /// Remove a unit; unknown keys are ignored.
    pub fn complete(&self, account_id: &str, region: &str, scanner: &str) {
        self.remove_key(&UnitKey::new(account_id, region, scanner));
    }

    /// Running units ordered by account, scanner, then region.
    pub fn snapshot(&self) -> Vec<ScannerProgress> {
        let mut running: Vec<ScannerProgress> = self
            .running
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        running.sort_by(|a, b| {
            (&a.account_id, &a.scanner, &a.region)
                .cmp(&(&b.account_id, &b.scanner, &b.region))
        });
        running
    }

    /// Units currently running.
    pub fn len(&self) -> usize {
        self.running
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update_key(&self, key: &UnitKey, count: usize) {
        if let Some(progress) = self.write().get_mut(key) {
            progress.result_count = count;
        }
    }

    fn remove_key(&self, key: &UnitKey) {
        self.write().remove(key);
    }

    fn write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<UnitKey, ScannerProgress>> {
        self.running.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped progress entry for one unit.
pub struct ProgressGuard {
    tracker: Arc<ProgressTracker>,
    key: UnitKey,
}

impl ProgressGuard {
    /// Set the running result count.
    pub fn update_count(&self, count: usize) {
        self.tracker.update_key(&self.key, count);
    }
}

impl fmt::Debug for ProgressGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressGuard").field("key", &self.key).finish()
    }
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.tracker.remove_key(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_update_complete_roundtrip() {
        let tracker = ProgressTracker::new();
        tracker.start("1", "prod", "us-east-1", "EBS Volumes");
        tracker.update_count("1", "us-east-1", "EBS Volumes", 4);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].result_count, 4);
        assert_eq!(snapshot[0].account_name, "prod");

        tracker.complete("1", "us-east-1", "EBS Volumes");
        assert!(tracker.is_empty());
    }

    #[test]
    fn update_after_complete_is_ignored() {
        let tracker = ProgressTracker::new();
        tracker.start("1", "prod", "global", "IAM Roles");
        tracker.complete("1", "global", "IAM Roles");
        tracker.update_count("1", "global", "IAM Roles", 9);
        assert!(tracker.snapshot().is_empty());
    }

    #[test]
    fn guard_releases_on_error_path() {
        let tracker = Arc::new(ProgressTracker::new());

        fn failing_unit(tracker: &Arc<ProgressTracker>) -> Result<(), String> {
            let guard = tracker.track("1", "prod", "us-west-2", "EBS Volumes");
            guard.update_count(2);
            Err("regional session failed".to_string())?;
            Ok(())
        }

        assert!(failing_unit(&tracker).is_err());
        assert!(tracker.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_by_account_then_scanner() {
        let tracker = ProgressTracker::new();
        tracker.start("2", "b", "us-east-1", "EBS Volumes");
        tracker.start("1", "a", "us-west-2", "IAM Roles");
        tracker.start("1", "a", "us-east-1", "EBS Snapshots");

        let order: Vec<_> = tracker
            .snapshot()
            .into_iter()
            .map(|p| (p.account_id, p.scanner))
            .collect();
        assert_eq!(
            order,
            vec![
                ("1".to_string(), "EBS Snapshots".to_string()),
                ("1".to_string(), "IAM Roles".to_string()),
                ("2".to_string(), "EBS Volumes".to_string()),
            ]
        );
    }
}
