use std::sync::Arc;

use async_trait::async_trait;
use cloudsift_core::credentials::role_arn;
use cloudsift_core::error::{Result, SiftError};
use cloudsift_core::ports::SessionProvider;
use cloudsift_core::types::{Account, CANONICAL_GLOBAL_REGION, CallerIdentity};
use tracing::debug;

use super::Inventory;

/// Credential handle scoped to one account and, optionally, one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySession {
    pub account_id: String,
    pub region: Option<String>,
    /// Role ARN the session was obtained with; `None` for base credentials.
    pub role: Option<String>,
}

/// [`SessionProvider`] answering from an [`Inventory`] snapshot.
#[derive(Debug, Clone)]
pub struct InventoryProvider {
    inventory: Arc<Inventory>,
}

impl InventoryProvider {
    pub fn new(inventory: Arc<Inventory>) -> Self {
        Self { inventory }
    }

    fn knows_region(&self, region: &str) -> bool {
        region == CANONICAL_GLOBAL_REGION
            || self.inventory.regions.iter().any(|r| r == region)
    }
}

#[async_trait]
impl SessionProvider for InventoryProvider {
    type Session = InventorySession;

    async fn base_session(
        &self,
        profile: Option<&str>,
        region: Option<&str>,
    ) -> Result<InventorySession> {
        debug!(profile = profile.unwrap_or("default"), "Loading base profile");
        let current = &self.inventory.current_account;
        if current.id.is_empty() {
            return Err(SiftError::Session(
                "inventory has no current account".into(),
            ));
        }
        Ok(InventorySession {
            account_id: current.id.clone(),
            region: region.map(str::to_string),
            role: None,
        })
    }

    async fn organization_session(
        &self,
        role: &str,
        region: &str,
    ) -> Result<InventorySession> {
        let account_id = self.inventory.current_account.id.clone();
        if !self.inventory.organization_access {
            return Err(SiftError::Session(format!(
                "access denied assuming {}",
                role_arn(&account_id, role)
            )));
        }
        Ok(InventorySession {
            role: Some(role_arn(&account_id, role)),
            account_id,
            region: Some(region.to_string()),
        })
    }

    async fn list_organization_accounts(
        &self,
        _session: &InventorySession,
    ) -> Result<Vec<Account>> {
        if self.inventory.organization.is_empty() {
            return Err(SiftError::Session(
                "account is not a member of an organization".into(),
            ));
        }
        Ok(self.inventory.organization.clone())
    }

    async fn current_account(
        &self,
        session: &InventorySession,
    ) -> Result<Account> {
        let current = &self.inventory.current_account;
        if current.id != session.account_id {
            return Err(SiftError::Identity(format!(
                "session belongs to {}, not the current account",
                session.account_id
            )));
        }
        Ok(current.clone())
    }

    async fn assume_role(
        &self,
        _session: &InventorySession,
        account: &Account,
        role_arn: &str,
    ) -> Result<InventorySession> {
        if !self.inventory.can_assume(&account.id) {
            return Err(SiftError::Session(format!(
                "not authorized to assume {role_arn}"
            )));
        }
        Ok(InventorySession {
            account_id: account.id.clone(),
            region: None,
            role: Some(role_arn.to_string()),
        })
    }

    async fn verify_identity(
        &self,
        session: &InventorySession,
    ) -> Result<CallerIdentity> {
        let arn = session.role.clone().unwrap_or_else(|| {
            format!("arn:aws:iam::{}:root", session.account_id)
        });
        Ok(CallerIdentity {
            account_id: session.account_id.clone(),
            arn,
        })
    }

    async fn regional_session(
        &self,
        session: &InventorySession,
        region: &str,
    ) -> Result<InventorySession> {
        if !self.knows_region(region) {
            return Err(SiftError::Session(format!("unknown region {region}")));
        }
        Ok(InventorySession {
            region: Some(region.to_string()),
            ..session.clone()
        })
    }

    async fn available_regions(
        &self,
        _session: &InventorySession,
    ) -> Result<Vec<String>> {
        Ok(self.inventory.regions.clone())
    }

    async fn validate_regions(
        &self,
        _session: &InventorySession,
        regions: &[String],
    ) -> Result<()> {
        let invalid: Vec<&str> = regions
            .iter()
            .filter(|region| !self.knows_region(region))
            .map(String::as_str)
            .collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(SiftError::InvalidConfig(format!(
                "invalid regions: {}",
                invalid.join(", ")
            )))
        }
    }
}
