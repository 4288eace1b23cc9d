//! The credential and session port.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Account, CallerIdentity};

/// Credential and session plumbing consumed by the resolver and the scan
/// units. `Session` is an opaque, cheaply clonable credential handle.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: Clone + Send + Sync + 'static;

    /// Session built from the operator's base profile.
    async fn base_session(
        &self,
        profile: Option<&str>,
        region: Option<&str>,
    ) -> Result<Self::Session>;

    /// Session obtained by assuming the organization role from the base
    /// credentials.
    async fn organization_session(
        &self,
        role: &str,
        region: &str,
    ) -> Result<Self::Session>;

    async fn list_organization_accounts(
        &self,
        session: &Self::Session,
    ) -> Result<Vec<Account>>;

    async fn current_account(&self, session: &Self::Session) -> Result<Account>;

    /// Assume `role_arn` in `account` using `session` as the source
    /// credentials.
    async fn assume_role(
        &self,
        session: &Self::Session,
        account: &Account,
        role_arn: &str,
    ) -> Result<Self::Session>;

    /// Live identity check proving the session's credentials work.
    async fn verify_identity(
        &self,
        session: &Self::Session,
    ) -> Result<CallerIdentity>;

    async fn regional_session(
        &self,
        session: &Self::Session,
        region: &str,
    ) -> Result<Self::Session>;

    async fn available_regions(
        &self,
        session: &Self::Session,
    ) -> Result<Vec<String>>;

    async fn validate_regions(
        &self,
        session: &Self::Session,
        regions: &[String],
    ) -> Result<()>;
}
