//! In-memory collaborators for orchestrator tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use cloudsift_core::error::{Result, SiftError};
use cloudsift_core::ports::{ScanOptions, Scanner, SessionProvider};
use cloudsift_core::types::{Account, CallerIdentity, ScanResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FakeSession {
    pub account_id: String,
    pub region: Option<String>,
    pub role: Option<String>,
}

/// Scriptable organization: which calls succeed is decided by plain fields.
#[derive(Debug)]
pub struct FakeProvider {
    pub current: Account,
    pub organization: Vec<Account>,
    pub organization_access: bool,
    pub listing_fails: bool,
    /// Accounts whose scanner role cannot be assumed.
    pub unassumable: HashSet<String>,
    /// Accounts whose assumed identity fails verification.
    pub unverifiable: HashSet<String>,
    /// (account, region) pairs that fail regional session creation.
    pub broken_regions: HashSet<(String, String)>,
    pub available_regions: Vec<String>,
    pub region_validation_fails: bool,
    pub assume_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn organization(accounts: &[(&str, &str)]) -> Self {
        let organization: Vec<Account> = accounts
            .iter()
            .map(|(id, name)| Account::new(*id, *name))
            .collect();
        Self {
            current: organization[0].clone(),
            organization,
            organization_access: true,
            listing_fails: false,
            unassumable: HashSet::new(),
            unverifiable: HashSet::new(),
            broken_regions: HashSet::new(),
            available_regions: vec!["us-east-1".into(), "us-west-2".into()],
            region_validation_fails: false,
            assume_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SessionProvider for FakeProvider {
    type Session = FakeSession;

    async fn base_session(
        &self,
        _profile: Option<&str>,
        region: Option<&str>,
    ) -> Result<FakeSession> {
        Ok(FakeSession {
            account_id: self.current.id.clone(),
            region: region.map(str::to_string),
            role: None,
        })
    }

    async fn organization_session(
        &self,
        role: &str,
        region: &str,
    ) -> Result<FakeSession> {
        if !self.organization_access {
            return Err(SiftError::Session(format!(
                "AccessDenied assuming {role}"
            )));
        }
        Ok(FakeSession {
            account_id: self.current.id.clone(),
            region: Some(region.to_string()),
            role: Some(role.to_string()),
        })
    }

    async fn list_organization_accounts(
        &self,
        _session: &FakeSession,
    ) -> Result<Vec<Account>> {
        if self.listing_fails {
            return Err(SiftError::Session("organizations disabled".into()));
        }
        Ok(self.organization.clone())
    }

    async fn current_account(&self, _session: &FakeSession) -> Result<Account> {
        Ok(self.current.clone())
    }

    async fn assume_role(
        &self,
        _session: &FakeSession,
        account: &Account,
        role_arn: &str,
    ) -> Result<FakeSession> {
        self.assume_calls.fetch_add(1, Ordering::SeqCst);
        if self.unassumable.contains(&account.id) {
            return Err(SiftError::Session(format!("cannot assume {role_arn}")));
        }
        Ok(FakeSession {
            account_id: account.id.clone(),
            region: None,
            role: Some(role_arn.to_string()),
        })
    }

    async fn verify_identity(
        &self,
        session: &FakeSession,
    ) -> Result<CallerIdentity> {
        if self.unverifiable.contains(&session.account_id) {
            return Err(SiftError::Identity("expired token".into()));
        }
        Ok(CallerIdentity {
            account_id: session.account_id.clone(),
            arn: session.role.clone().unwrap_or_default(),
        })
    }

    async fn regional_session(
        &self,
        session: &FakeSession,
        region: &str,
    ) -> Result<FakeSession> {
        let key = (session.account_id.clone(), region.to_string());
        if self.broken_regions.contains(&key) {
            return Err(SiftError::Session(format!(
                "no endpoint for {region}"
            )));
        }
        Ok(FakeSession {
            region: Some(region.to_string()),
            ..session.clone()
        })
    }

    async fn available_regions(
        &self,
        _session: &FakeSession,
    ) -> Result<Vec<String>> {
        Ok(self.available_regions.clone())
    }

    async fn validate_regions(
        &self,
        _session: &FakeSession,
        regions: &[String],
    ) -> Result<()> {
        if self.region_validation_fails {
            return Err(SiftError::Session("DescribeRegions denied".into()));
        }
        match regions.iter().find(|r| !self.available_regions.contains(r)) {
            Some(region) => {
                Err(SiftError::InvalidConfig(format!("invalid region {region}")))
            }
            None => Ok(()),
        }
    }
}

/// Scanner returning canned results per (account, region).
#[derive(Debug, Default)]
pub struct FakeScanner {
    pub label: String,
    pub global: bool,
    pub results: BTreeMap<(String, String), Vec<ScanResult>>,
    /// Accounts whose scan call errors.
    pub failing_accounts: HashSet<String>,
    /// Upper bound of a random per-call delay.
    pub max_delay: Duration,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<(String, String, u32)>>,
    running: AtomicUsize,
    pub peak_running: AtomicUsize,
}

impl FakeScanner {
    pub fn regional(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Self::default()
        }
    }

    pub fn global(label: &str) -> Self {
        Self {
            label: label.to_string(),
            global: true,
            ..Self::default()
        }
    }

    pub fn with_results(
        mut self,
        account: &str,
        region: &str,
        ids: &[&str],
    ) -> Self {
        let results = ids.iter().map(|id| ScanResult::new(*id)).collect();
        self.results
            .insert((account.to_string(), region.to_string()), results);
        self
    }

    pub fn failing_for(mut self, account: &str) -> Self {
        self.failing_accounts.insert(account.to_string());
        self
    }

    pub fn with_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }
}

#[async_trait]
impl Scanner<FakeSession> for FakeScanner {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_global(&self) -> bool {
        self.global
    }

    async fn scan(
        &self,
        options: ScanOptions<FakeSession>,
    ) -> Result<Vec<ScanResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_running.fetch_max(running, Ordering::SeqCst);

        let account = options.session.account_id.clone();
        self.seen
            .lock()
            .unwrap()
            .push((account.clone(), options.region.clone(), options.days_unused));

        if !self.max_delay.is_zero() {
            let max = self.max_delay.as_millis() as u64;
            let delay = rand::rng().random_range(0..=max);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if self.failing_accounts.contains(&account) {
            return Err(SiftError::scanner(&self.label, "throttled"));
        }
        Ok(self
            .results
            .get(&(account, options.region))
            .cloned()
            .unwrap_or_default())
    }
}
