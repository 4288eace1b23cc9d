//! The scanner port.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ScanResult;

/// Inputs handed to a scanner for one unit of work.
#[derive(Clone, Debug)]
pub struct ScanOptions<S> {
    /// Region the scanner runs against.
    pub region: String,
    /// Idle threshold in days.
    pub days_unused: u32,
    /// Region-bound credentialed session for the unit's account.
    pub session: S,
}

/// A pluggable resource inspector.
///
/// Implementations own their cloud-API calls; the orchestrator only relies
/// on the label (also the key of the result map) and the scope flag.
#[async_trait]
pub trait Scanner<S>: Send + Sync {
    /// Stable human-readable name, e.g. `"EBS Volumes"`.
    fn label(&self) -> &str;

    /// Account-wide scanners run once per account against the canonical
    /// region instead of once per requested region.
    fn is_global(&self) -> bool {
        false
    }

    async fn scan(&self, options: ScanOptions<S>) -> Result<Vec<ScanResult>>;
}
