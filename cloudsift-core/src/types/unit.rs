//! Scan units and their structural identity.

use std::fmt;
use std::sync::Arc;

use crate::ports::Scanner;

use super::Account;

/// Region every global-scope scanner is executed against.
pub const CANONICAL_GLOBAL_REGION: &str = "us-east-1";

/// Region label reported for units of global-scope scanners.
pub const GLOBAL_REGION_LABEL: &str = "global";

/// Structural identity of a scan unit: (account, reported region, scanner).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitKey {
    /// Account id.
    pub account_id: String,
    /// Reported region label.
    pub region: String,
    /// Scanner label.
    pub scanner: String,
}

impl UnitKey {
    /// Key from its three parts.
    pub fn new(
        account_id: impl Into<String>,
        region: impl Into<String>,
        scanner: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            scanner: scanner.into(),
        }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.account_id, self.region, self.scanner)
    }
}

/// One schedulable piece of work: a scanner run against a single account
/// in a single region.
pub struct ScanUnit<S> {
    /// Account the unit scans.
    pub account: Account,
    /// Region the scanner is executed against. For global-scope scanners
    /// this is always [`CANONICAL_GLOBAL_REGION`].
    pub region: String,
    /// Scanner label.
    pub scanner: Arc<dyn Scanner<S>>,
}

impl<S> ScanUnit<S> {
    /// Scanner label.
    pub fn label(&self) -> &str {
        self.scanner.label()
    }

    /// Whether the scanner is global-scope.
    pub fn is_global(&self) -> bool {
        self.scanner.is_global()
    }

    /// Region label used for logging, progress keys and result details.
    pub fn reported_region(&self) -> &str {
        if self.is_global() {
            GLOBAL_REGION_LABEL
        } else {
            &self.region
        }
    }

    /// Identity used by progress tracking.
    pub fn key(&self) -> UnitKey {
        UnitKey::new(&self.account.id, self.reported_region(), self.label())
    }
}

impl<S> Clone for ScanUnit<S> {
    fn clone(&self) -> Self {
        Self {
            account: self.account.clone(),
            region: self.region.clone(),
            scanner: Arc::clone(&self.scanner),
        }
    }
}

impl<S> fmt::Debug for ScanUnit<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanUnit")
            .field("account", &self.account)
            .field("region", &self.region)
            .field("scanner", &self.label())
            .field("global", &self.is_global())
            .finish()
    }
}
