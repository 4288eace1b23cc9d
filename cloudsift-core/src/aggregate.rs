//! Thread-safe accumulation of retained results per account and scanner.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::error::{Result, SiftError};
use crate::types::{Account, AccountResultSet, ScanResult};

/// Collects results from concurrently running units. Every account that was
/// resolved appears in the output, even when no unit produced a result.
#[derive(Debug)]
pub struct ResultAggregator {
    accounts: Mutex<BTreeMap<String, AccountResultSet>>,
}

impl ResultAggregator {
    /// Register an empty result set for each of `accounts`.
    pub fn new(accounts: &[Account]) -> Self {
        let accounts = accounts
            .iter()
            .map(|a| (a.id.clone(), AccountResultSet::new(&a.id, &a.name)))
            .collect();
        Self {
            accounts: Mutex::new(accounts),
        }
    }

    /// Append `results` under `scanner` for `account_id`.
    ///
    /// Concurrent appends to the same scanner key preserve every result; the
    /// relative order between units is unspecified.
    pub fn append(
        &self,
        account_id: &str,
        scanner: &str,
        results: Vec<ScanResult>,
    ) -> Result<()> {
        let mut accounts =
            self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        let set = accounts
            .get_mut(account_id)
            .ok_or_else(|| SiftError::UnknownAccount(account_id.to_string()))?;
        set.results
            .entry(scanner.to_string())
            .or_default()
            .extend(results);
        Ok(())
    }

    /// Drain the per-account results, ordered by account id. Account
    /// entries remain registered but empty afterwards.
    pub fn take_results(&self) -> Vec<AccountResultSet> {
        let mut accounts =
            self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        accounts
            .values_mut()
            .map(|set| {
                let empty =
                    AccountResultSet::new(&set.account_id, &set.account_name);
                std::mem::replace(set, empty)
            })
            .collect()
    }
}
