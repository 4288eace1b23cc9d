//! Name-keyed scanner registry and operator selection.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SiftError};
use crate::ports::Scanner;

/// Scanners known to the process, keyed by their CLI name
/// (e.g. `ebs-volumes`).
pub struct ScannerRegistry<S> {
    scanners: BTreeMap<String, Arc<dyn Scanner<S>>>,
}

/// Outcome of resolving an operator-supplied scanner list.
pub struct ScannerSelection<S> {
    /// Resolved scanners without duplicates.
    pub scanners: Vec<Arc<dyn Scanner<S>>>,
    /// Requested names with no registered scanner.
    pub invalid: Vec<String>,
}

impl<S> ScannerRegistry<S> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            scanners: BTreeMap::new(),
        }
    }

    /// Register `scanner` under `name`. Names are matched case-insensitively
    /// and a repeated name replaces the earlier entry. Aliases of the same
    /// instance are allowed, but a different instance reusing a label is
    /// rejected since labels key progress entries and result sets.
    pub fn register<T>(
        &mut self,
        name: impl Into<String>,
        scanner: T,
    ) -> Result<()>
    where
        T: Scanner<S> + 'static,
    {
        self.register_arc(name, Arc::new(scanner))
    }

    /// Shared-instance form of [`ScannerRegistry::register`].
    pub fn register_arc(
        &mut self,
        name: impl Into<String>,
        scanner: Arc<dyn Scanner<S>>,
    ) -> Result<()> {
        let name = normalize(&name.into());
        let clash = self.scanners.iter().find(|(existing, other)| {
            **existing != name
                && other.label() == scanner.label()
                && !Arc::ptr_eq(*other, &scanner)
        });
        if let Some((existing, _)) = clash {
            return Err(SiftError::DuplicateScannerLabel {
                label: scanner.label().to_string(),
                existing: existing.clone(),
                name,
            });
        }
        self.scanners.insert(name, scanner);
        Ok(())
    }

    /// Builder form of [`ScannerRegistry::register`].
    pub fn with_scanner<T>(
        mut self,
        name: impl Into<String>,
        scanner: T,
    ) -> Result<Self>
    where
        T: Scanner<S> + 'static,
    {
        self.register(name, scanner)?;
        Ok(self)
    }

    /// Scanner registered under `name`, ignoring case.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Scanner<S>>> {
        self.scanners.get(&normalize(name)).cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.scanners.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// Resolve `requested` into scanners. An empty request selects every
    /// registered scanner in name order; unknown names are reported back
    /// rather than failing the lookup.
    pub fn select(&self, requested: &[String]) -> ScannerSelection<S> {
        let requested: Vec<&str> = requested
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();

        if requested.is_empty() {
            return ScannerSelection {
                scanners: self.scanners.values().cloned().collect(),
                invalid: Vec::new(),
            };
        }

        let mut scanners: Vec<Arc<dyn Scanner<S>>> = Vec::new();
        let mut invalid = Vec::new();
        for name in requested {
            match self.get(name) {
                Some(scanner) => {
                    let duplicate =
                        scanners.iter().any(|s| Arc::ptr_eq(s, &scanner));
                    if !duplicate {
                        scanners.push(scanner);
                    }
                }
                None => invalid.push(name.to_string()),
            }
        }

        ScannerSelection { scanners, invalid }
    }
}

impl<S> Default for ScannerRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for ScannerRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: BTreeMap<&str, &str> = self
            .scanners
            .iter()
            .map(|(name, scanner)| (name.as_str(), scanner.label()))
            .collect();
        f.debug_struct("ScannerRegistry")
            .field("scanners", &entries)
            .finish()
    }
}

impl<S> fmt::Debug for ScannerSelection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = self.scanners.iter().map(|s| s.label()).collect();
        f.debug_struct("ScannerSelection")
            .field("scanners", &labels)
            .field("invalid", &self.invalid)
            .finish()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
