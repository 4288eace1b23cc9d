//! Operator-supplied ignore rules applied to raw scanner findings.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::ScanResult;

/// Resources to drop from the report. All comparisons ignore ASCII and
/// Unicode case.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreRules {
    /// Resource ids to drop.
    pub resource_ids: BTreeSet<String>,
    /// Resource names to drop.
    pub resource_names: BTreeSet<String>,
    /// Tag key and value pairs; a result carrying any pair is dropped.
    pub tags: BTreeMap<String, String>,
}

/// Which rule dropped a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreMatch {
    /// Matched by resource id.
    ResourceId,
    /// Matched by resource name.
    ResourceName,
    /// Matched by a tag pair.
    Tag,
}

impl IgnoreRules {
    /// True when no rule of any category is set.
    pub fn is_empty(&self) -> bool {
        self.resource_ids.is_empty()
            && self.resource_names.is_empty()
            && self.tags.is_empty()
    }

    /// First matching rule for `result`, checked by id, then name, then tag.
    pub fn matches(&self, result: &ScanResult) -> Option<IgnoreMatch> {
        FoldedRules::new(self).matches(result)
    }
}

/// Retain the results no rule matches. `scanner` is only used for tracing.
pub fn filter(
    results: Vec<ScanResult>,
    rules: &IgnoreRules,
    scanner: &str,
) -> Vec<ScanResult> {
    if rules.is_empty() {
        return results;
    }
    let rules = FoldedRules::new(rules);
    results
        .into_iter()
        .filter(|result| match rules.matches(result) {
            None => true,
            Some(rule) => {
                debug!(
                    scanner,
                    resource_id = %result.resource_id,
                    resource_name = %result.resource_name,
                    rule = ?rule,
                    "Ignoring resource"
                );
                false
            }
        })
        .collect()
}

/// Rules lowercased once so each result costs a hash lookup per field.
struct FoldedRules {
    resource_ids: HashSet<String>,
    resource_names: HashSet<String>,
    tags: HashSet<(String, String)>,
}

impl FoldedRules {
    fn new(rules: &IgnoreRules) -> Self {
        Self {
            resource_ids: rules.resource_ids.iter().map(|id| fold(id)).collect(),
            resource_names: rules
                .resource_names
                .iter()
                .map(|name| fold(name))
                .collect(),
            tags: rules
                .tags
                .iter()
                .map(|(key, value)| (fold(key), fold(value)))
                .collect(),
        }
    }

    fn matches(&self, result: &ScanResult) -> Option<IgnoreMatch> {
        if self.resource_ids.contains(&fold(&result.resource_id)) {
            return Some(IgnoreMatch::ResourceId);
        }
        if self.resource_names.contains(&fold(&result.resource_name)) {
            return Some(IgnoreMatch::ResourceName);
        }
        if self.tags.is_empty() {
            return None;
        }
        result
            .tags
            .iter()
            .any(|(key, value)| self.tags.contains(&(fold(key), fold(value))))
            .then_some(IgnoreMatch::Tag)
    }
}

fn fold(value: &str) -> String {
    value.to_lowercase()
}
