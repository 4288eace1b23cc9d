use std::sync::Arc;

use async_trait::async_trait;
use cloudsift_core::error::Result;
use cloudsift_core::ports::{ScanOptions, Scanner};
use cloudsift_core::registry::ScannerRegistry;
use cloudsift_core::types::ScanResult;
use serde_json::Value;

use super::{Inventory, InventoryResource, InventorySession};

/// Built-in scanners: (registry name, label, global scope).
pub const BUILTIN_SCANNERS: &[(&str, &str, bool)] = &[
    ("ebs-volumes", "EBS Volumes", false),
    ("ebs-snapshots", "EBS Snapshots", false),
    ("ec2-instances", "EC2 Instances", false),
    ("elastic-ips", "Elastic IPs", false),
    ("rds-instances", "RDS Instances", false),
    ("iam-roles", "IAM Roles", true),
    ("iam-users", "IAM Users", true),
];

/// Reports snapshot resources recorded under one scanner name.
#[derive(Debug, Clone)]
pub struct InventoryScanner {
    name: &'static str,
    label: &'static str,
    global: bool,
    inventory: Arc<Inventory>,
}

impl InventoryScanner {
    pub fn new(
        name: &'static str,
        label: &'static str,
        global: bool,
        inventory: Arc<Inventory>,
    ) -> Self {
        Self {
            name,
            label,
            global,
            inventory,
        }
    }

    fn matches(
        &self,
        resource: &InventoryResource,
        account_id: &str,
        options: &ScanOptions<InventorySession>,
    ) -> bool {
        resource.scanner.eq_ignore_ascii_case(self.name)
            && resource.account_id == account_id
            && (self.global || resource.region == options.region)
            && resource.days_unused >= options.days_unused
    }
}

#[async_trait]
impl Scanner<InventorySession> for InventoryScanner {
    fn label(&self) -> &str {
        self.label
    }

    fn is_global(&self) -> bool {
        self.global
    }

    async fn scan(
        &self,
        options: ScanOptions<InventorySession>,
    ) -> Result<Vec<ScanResult>> {
        let account_id = options.session.account_id.as_str();
        let results = self
            .inventory
            .resources
            .iter()
            .filter(|resource| self.matches(resource, account_id, &options))
            .map(to_result)
            .collect();
        Ok(results)
    }
}

fn to_result(resource: &InventoryResource) -> ScanResult {
    let mut details = resource.details.clone();
    details.insert("days_unused".into(), Value::from(resource.days_unused));
    ScanResult {
        resource_type: resource.resource_type.clone(),
        resource_id: resource.resource_id.clone(),
        resource_name: resource.resource_name.clone(),
        reason: resource.reason.clone(),
        tags: resource.tags.clone(),
        details,
        account_id: resource.account_id.clone(),
        account_name: String::new(),
    }
}

/// Registry holding every built-in scanner over `inventory`.
pub fn builtin_registry(
    inventory: Arc<Inventory>,
) -> Result<ScannerRegistry<InventorySession>> {
    BUILTIN_SCANNERS.iter().try_fold(
        ScannerRegistry::new(),
        |registry, &(name, label, global)| {
            registry.with_scanner(
                name,
                InventoryScanner::new(
                    name,
                    label,
                    global,
                    Arc::clone(&inventory),
                ),
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(
        scanner: &str,
        region: &str,
        id: &str,
        days_unused: u32,
    ) -> InventoryResource {
        InventoryResource {
            scanner: scanner.into(),
            account_id: "111111111111".into(),
            region: region.into(),
            resource_id: id.into(),
            days_unused,
            ..InventoryResource::default()
        }
    }

    fn options(region: &str, days_unused: u32) -> ScanOptions<InventorySession> {
        ScanOptions {
            region: region.into(),
            days_unused,
            session: InventorySession {
                account_id: "111111111111".into(),
                region: Some(region.into()),
                role: None,
            },
        }
    }

    fn inventory() -> Arc<Inventory> {
        Arc::new(Inventory {
            resources: vec![
                resource("ebs-volumes", "us-east-1", "vol-old", 120),
                resource("ebs-volumes", "us-east-1", "vol-new", 3),
                resource("ebs-volumes", "us-west-2", "vol-west", 200),
                resource("iam-roles", "global", "role/legacy", 400),
            ],
            ..Inventory::default()
        })
    }

    #[tokio::test]
    async fn regional_scanner_filters_region_and_age() {
        let scanner =
            InventoryScanner::new("ebs-volumes", "EBS Volumes", false, inventory());
        let results = scanner.scan(options("us-east-1", 90)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].resource_id, "vol-old");
        assert_eq!(results[0].details["days_unused"], Value::from(120));
    }

    #[tokio::test]
    async fn global_scanner_ignores_region() {
        let scanner =
            InventoryScanner::new("iam-roles", "IAM Roles", true, inventory());
        let results = scanner.scan(options("us-east-1", 90)).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].resource_id, "role/legacy");
    }

    #[test]
    fn registry_exposes_every_builtin() {
        let registry =
            builtin_registry(Arc::new(Inventory::default())).unwrap();
        assert_eq!(registry.len(), BUILTIN_SCANNERS.len());
        let roles = registry.get("iam-roles").unwrap();
        assert!(roles.is_global());
        assert_eq!(roles.label(), "IAM Roles");
        assert!(!registry.get("ebs-snapshots").unwrap().is_global());
    }
}
