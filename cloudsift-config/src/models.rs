use std::path::PathBuf;
use std::time::Duration;

use cloudsift_core::ScanRequest;
use cloudsift_core::credentials::CredentialChain;
use cloudsift_core::filter::IgnoreRules;
use cloudsift_core::orchestrator::{
    DEFAULT_DAYS_UNUSED, DEFAULT_PROGRESS_INTERVAL,
};

use crate::error::ConfigLoadError;

pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Fully resolved scan settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Regions to scan; empty means every available region.
    pub regions: Vec<String>,
    /// Scanner names to run; empty means all registered scanners.
    pub scanners: Vec<String>,
    /// Account allow-list; empty means every reachable account.
    pub accounts: Vec<String>,
    pub organization_role: Option<String>,
    pub scanner_role: Option<String>,
    pub profile: Option<String>,
    /// Minimum number of days a resource must be unused to be reported.
    pub days_unused: u32,
    /// Upper bound on concurrently running scan units.
    pub max_workers: usize,
    pub progress_interval: Duration,
    pub output_dir: PathBuf,
    pub ignore: IgnoreRules,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            regions: Vec::new(),
            scanners: Vec::new(),
            accounts: Vec::new(),
            organization_role: None,
            scanner_role: None,
            profile: None,
            days_unused: DEFAULT_DAYS_UNUSED,
            max_workers: DEFAULT_MAX_WORKERS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            ignore: IgnoreRules::default(),
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.max_workers == 0 {
            return Err(ConfigLoadError::Validation(
                "max_workers must be at least 1".into(),
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(ConfigLoadError::Validation(
                "progress_interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Whether members of an organization are scanned through role chaining.
    pub fn uses_role_chaining(&self) -> bool {
        self.organization_role.is_some() && self.scanner_role.is_some()
    }

    pub fn to_request(&self) -> ScanRequest {
        ScanRequest {
            credentials: CredentialChain {
                organization_role: self.organization_role.clone(),
                scanner_role: self.scanner_role.clone(),
                profile: self.profile.clone(),
                requested_accounts: self.accounts.clone(),
            },
            regions: self.regions.clone(),
            scanners: self.scanners.clone(),
            days_unused: self.days_unused,
            ignore: self.ignore.clone(),
            progress_interval: self.progress_interval,
        }
    }
}
