//! Expansion of accounts, regions and scanners into scan units.

use std::sync::Arc;

use crate::ports::Scanner;
use crate::types::{Account, CANONICAL_GLOBAL_REGION, ScanUnit};

/// Regions a scanner is actually executed in.
pub fn effective_regions<'a, S>(
    scanner: &dyn Scanner<S>,
    regions: &'a [String],
) -> Vec<&'a str> {
    if scanner.is_global() {
        vec![CANONICAL_GLOBAL_REGION]
    } else {
        regions.iter().map(String::as_str).collect()
    }
}

/// Expand accounts × effective regions × scanners into scan units.
///
/// Emission order is scanner-major, then region, then account.
pub fn expand<S>(
    scanners: &[Arc<dyn Scanner<S>>],
    regions: &[String],
    accounts: &[Account],
) -> Vec<ScanUnit<S>> {
    let mut units = Vec::new();
    for scanner in scanners {
        for region in effective_regions(scanner.as_ref(), regions) {
            for account in accounts {
                units.push(ScanUnit {
                    account: account.clone(),
                    region: region.to_string(),
                    scanner: Arc::clone(scanner),
                });
            }
        }
    }
    units
}

/// Number of units [`expand`] produces, without building them.
pub fn expected_unit_count<S>(
    scanners: &[Arc<dyn Scanner<S>>],
    region_count: usize,
    account_count: usize,
) -> usize {
    scanners
        .iter()
        .map(|s| if s.is_global() { 1 } else { region_count })
        .sum::<usize>()
        * account_count
}
