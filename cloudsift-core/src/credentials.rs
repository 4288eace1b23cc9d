//! Credential chain resolution: base profile → organization role → scanner
//! role per member account.
//!
//! Every level degrades to the one below it instead of aborting. The only
//! hard stop is an explicit account allow-list that matches nothing.

use std::collections::{HashMap, HashSet};
use std::fmt;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SiftError};
use crate::ports::SessionProvider;
use crate::types::Account;

/// Region the organization session is created in for account listing.
pub const ORGANIZATION_SESSION_REGION: &str = "us-west-2";

/// Inputs to the resolver, read once at scan start.
#[derive(Clone, Debug, Default)]
pub struct CredentialChain {
    /// Role assumed in the management account to list the organization.
    pub organization_role: Option<String>,
    /// Role assumed in each member account to run scanners.
    pub scanner_role: Option<String>,
    /// Named local profile for the base session.
    pub profile: Option<String>,
    /// Explicit account allow-list; empty means every listed account.
    pub requested_accounts: Vec<String>,
}

impl CredentialChain {
    fn organization_role(&self) -> Option<&str> {
        non_empty(self.organization_role.as_deref())
    }

    fn scanner_role(&self) -> Option<&str> {
        non_empty(self.scanner_role.as_deref())
    }

    fn profile(&self) -> Option<&str> {
        non_empty(self.profile.as_deref())
    }
}

/// Accounts that have a usable session, in listing order.
pub struct ResolvedAccounts<S> {
    /// Credentialed session per account id.
    pub sessions: HashMap<String, S>,
    /// Accounts with a session, in listing order.
    pub accounts: Vec<Account>,
}

impl<S> ResolvedAccounts<S> {
    /// No accounts; the scan is skipped.
    pub fn empty() -> Self {
        Self {
            sessions: HashMap::new(),
            accounts: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Session for `account_id`, if one was created.
    pub fn session(&self, account_id: &str) -> Option<&S> {
        self.sessions.get(account_id)
    }
}

impl<S> fmt::Debug for ResolvedAccounts<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedAccounts")
            .field("accounts", &self.accounts)
            .field("session_count", &self.sessions.len())
            .finish()
    }
}

/// Full role ARN for `role` in `account_id`. Values that already look like
/// an ARN are returned untouched.
pub fn role_arn(account_id: &str, role: &str) -> String {
    if role.starts_with("arn:aws:iam::") {
        role.to_string()
    } else {
        format!("arn:aws:iam::{account_id}:role/{role}")
    }
}

/// Walks the credential chain against a [`SessionProvider`].
pub struct CredentialResolver<'a, P> {
    provider: &'a P,
}

impl<P> fmt::Debug for CredentialResolver<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("provider", &std::any::type_name::<P>())
            .finish()
    }
}

impl<'a, P> CredentialResolver<'a, P>
where
    P: SessionProvider,
{
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Resolve the accounts to scan and a session for each. Failures along
    /// the chain degrade to a smaller account set; only an allow-list that
    /// matches nothing is an error.
    pub async fn resolve(
        &self,
        chain: &CredentialChain,
    ) -> Result<ResolvedAccounts<P::Session>> {
        let org_session = self.organization_session(chain).await;
        let chaining = org_session.is_some() && chain.scanner_role().is_some();

        let (root, accounts) = match org_session {
            Some(org) if chaining => {
                let accounts = self.organization_accounts(&org).await;
                (org, accounts)
            }
            _ => {
                debug!("Using base profile session");
                let base = match self
                    .provider
                    .base_session(chain.profile(), None)
                    .await
                {
                    Ok(session) => session,
                    Err(err) => {
                        error!(error = %err, "Failed to create base session");
                        return Ok(ResolvedAccounts::empty());
                    }
                };
                let accounts = self.current_account(&base).await;
                (base, accounts)
            }
        };

        let Some(accounts) = accounts else {
            return Ok(ResolvedAccounts::empty());
        };

        let accounts = filter_requested(accounts, &chain.requested_accounts)?;

        let resolved = match chain.scanner_role() {
            Some(role) if chaining => {
                self.assume_scanner_role(&root, accounts, role).await
            }
            _ => ResolvedAccounts {
                sessions: accounts
                    .iter()
                    .map(|account| (account.id.clone(), root.clone()))
                    .collect(),
                accounts,
            },
        };

        if resolved.is_empty() {
            warn!("No valid sessions created for any accounts, scan will be skipped");
        }

        Ok(resolved)
    }

    async fn organization_session(
        &self,
        chain: &CredentialChain,
    ) -> Option<P::Session> {
        let role = chain.organization_role()?;
        info!(
            organization_role = role,
            scanner_role = chain.scanner_role().unwrap_or_default(),
            "Creating organization session"
        );
        match self
            .provider
            .organization_session(role, ORGANIZATION_SESSION_REGION)
            .await
        {
            Ok(session) => Some(session),
            Err(err) => {
                error!(
                    organization_role = role,
                    error = %err,
                    "Failed to create organization session"
                );
                info!("Falling back to base profile session");
                None
            }
        }
    }

    async fn organization_accounts(
        &self,
        session: &P::Session,
    ) -> Option<Vec<Account>> {
        match self.provider.list_organization_accounts(session).await {
            Ok(accounts) => Some(accounts),
            Err(err) => {
                error!(error = %err, "Failed to list organization accounts");
                info!("Falling back to current account");
                self.current_account(session).await
            }
        }
    }

    async fn current_account(
        &self,
        session: &P::Session,
    ) -> Option<Vec<Account>> {
        match self.provider.current_account(session).await {
            Ok(account) => Some(vec![account]),
            Err(err) => {
                error!(error = %err, "Failed to get current account");
                None
            }
        }
    }

    async fn assume_scanner_role(
        &self,
        org: &P::Session,
        accounts: Vec<Account>,
        role: &str,
    ) -> ResolvedAccounts<P::Session> {
        let attempts = accounts.into_iter().map(|account| async move {
            let arn = role_arn(&account.id, role);
            let session = match self.provider.assume_role(org, &account, &arn).await {
                Ok(session) => session,
                Err(err) => {
                    warn!(
                        account_id = %account.id,
                        account_name = %account.name,
                        role_arn = %arn,
                        error = %err,
                        "Failed to assume scanner role"
                    );
                    return None;
                }
            };

            match self.provider.verify_identity(&session).await {
                Ok(identity) => {
                    info!(
                        account_id = %account.id,
                        account_name = %account.name,
                        role_arn = %identity.arn,
                        "Successfully assumed scanner role"
                    );
                    Some((account, session))
                }
                Err(err) => {
                    warn!(
                        account_id = %account.id,
                        account_name = %account.name,
                        role_arn = %arn,
                        error = %err,
                        "Failed to verify scanner role assumption"
                    );
                    None
                }
            }
        });

        let mut resolved = ResolvedAccounts::empty();
        for (account, session) in join_all(attempts).await.into_iter().flatten() {
            resolved.sessions.insert(account.id.clone(), session);
            resolved.accounts.push(account);
        }
        resolved
    }
}

/// Apply the explicit allow-list. Unknown ids are warned about; an empty
/// result is the resolver's only fatal condition.
fn filter_requested(
    accounts: Vec<Account>,
    requested: &[String],
) -> Result<Vec<Account>> {
    let requested: Vec<&str> = requested
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect();
    if requested.is_empty() {
        return Ok(accounts);
    }

    let known: HashSet<&str> = accounts.iter().map(|a| a.id.as_str()).collect();
    let invalid: Vec<&str> = requested
        .iter()
        .copied()
        .filter(|id| !known.contains(id))
        .collect();
    if !invalid.is_empty() {
        warn!(
            invalid_accounts = ?invalid,
            "Some requested accounts do not exist in the organization"
        );
    }

    let wanted: HashSet<&str> = requested.iter().copied().collect();
    let filtered: Vec<Account> = accounts
        .into_iter()
        .filter(|account| wanted.contains(account.id.as_str()))
        .collect();

    if filtered.is_empty() {
        return Err(SiftError::NoRequestedAccounts {
            requested: requested.iter().map(|id| id.to_string()).collect(),
        });
    }
    Ok(filtered)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
