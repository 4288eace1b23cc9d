//! Offline inventory adapter.
//!
//! Stands in for a cloud SDK: organization layout, credentials policy and
//! resources are read from a JSON snapshot, so scans can be run and tested
//! without network access.

mod provider;
mod scanners;

pub use provider::{InventoryProvider, InventorySession};
pub use scanners::{BUILTIN_SCANNERS, builtin_registry};

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use cloudsift_core::types::Account;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Snapshot of an organization and its resources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    /// Account the base credentials belong to.
    pub current_account: Account,
    pub organization: Vec<Account>,
    /// Whether the organization role can be assumed from the base profile.
    pub organization_access: bool,
    pub regions: Vec<String>,
    /// Accounts where the scanner role can be assumed; `None` means all.
    pub assumable_accounts: Option<Vec<String>>,
    pub resources: Vec<InventoryResource>,
}

/// A resource as recorded in the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryResource {
    /// Registry name of the scanner that reports it, e.g. `ebs-volumes`.
    pub scanner: String,
    pub account_id: String,
    pub region: String,
    pub resource_id: String,
    pub resource_name: String,
    pub resource_type: String,
    pub tags: BTreeMap<String, String>,
    pub days_unused: u32,
    pub reason: String,
    pub details: Map<String, Value>,
}

impl Inventory {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = tokio::fs::read(path).await.with_context(|| {
            format!("failed to read inventory {}", path.display())
        })?;
        serde_json::from_slice(&raw).with_context(|| {
            format!("invalid inventory snapshot {}", path.display())
        })
    }

    pub fn can_assume(&self, account_id: &str) -> bool {
        self.assumable_accounts
            .as_ref()
            .is_none_or(|ids| ids.iter().any(|id| id == account_id))
    }
}
