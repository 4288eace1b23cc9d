//! Scanner findings and their per-account grouping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single finding produced by a scanner.
///
/// `details` is free-form scanner output; the orchestrator adds the
/// effective `region` label after filtering. `account_id`/`account_name`
/// are overwritten with the unit's account so scanners may leave them empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Provider resource type.
    #[serde(default)]
    pub resource_type: String,
    /// Provider identifier; always present.
    pub resource_id: String,
    /// Display name, possibly empty.
    #[serde(default)]
    pub resource_name: String,
    /// Why the resource was reported.
    #[serde(default)]
    pub reason: String,
    /// Resource tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Scanner-specific fields.
    #[serde(default)]
    pub details: Map<String, Value>,
    /// Account id.
    #[serde(default)]
    pub account_id: String,
    /// Account display name.
    #[serde(default)]
    pub account_name: String,
}

impl ScanResult {
    /// Finding with only `resource_id` set.
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            ..Self::default()
        }
    }

    /// Set the resource name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = name.into();
        self
    }

    /// Add a tag.
    pub fn with_tag(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Region label recorded by the orchestrator, if any.
    pub fn region(&self) -> Option<&str> {
        self.details.get("region").and_then(Value::as_str)
    }
}

/// All retained findings for one account, keyed by scanner label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountResultSet {
    /// Account id.
    pub account_id: String,
    /// Account display name.
    pub account_name: String,
    /// Findings keyed by scanner label.
    pub results: BTreeMap<String, Vec<ScanResult>>,
}

impl AccountResultSet {
    pub fn new(
        account_id: impl Into<String>,
        account_name: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            account_name: account_name.into(),
            results: BTreeMap::new(),
        }
    }

    /// Findings across every scanner.
    pub fn total_results(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    /// Findings of one scanner; empty when it produced none.
    pub fn scanner_results(&self, label: &str) -> &[ScanResult] {
        self.results.get(label).map(Vec::as_slice).unwrap_or_default()
    }
}
