//! Credential side-queries used by the deletion phase.
//!
//! A user being deleted may hold access keys, MFA devices, and a login
//! profile that must be removed first; the provider has no single call
//! for this, so the planner asks for them through a narrow trait. This
//! stays separate from `AccountData` because it is not declarative state
//! the planner diffs — it is only consulted when a user is already
//! known to be going away.

use async_trait::async_trait;

use crate::error::PlanError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessKeyMetadata {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaDeviceMetadata {
    pub serial_number: String,
}

/// Queried fresh on every `plan()` call; no caching, so a credential
/// deleted in a prior partial run simply does not reappear.
#[async_trait]
pub trait CredentialLookup: Send + Sync {
    async fn access_keys(&self, user: &str) -> Result<Vec<AccessKeyMetadata>, PlanError>;
    async fn mfa_devices(&self, user: &str) -> Result<Vec<MfaDeviceMetadata>, PlanError>;
    async fn has_login_profile(&self, user: &str) -> Result<bool, PlanError>;
}

/// A `CredentialLookup` that reports no credentials for any user.
/// Useful for callers (tests, `--dry-run` previews) that don't need
/// the detachment commands to be complete.
pub struct NoCredentials;

#[async_trait]
impl CredentialLookup for NoCredentials {
    async fn access_keys(&self, _user: &str) -> Result<Vec<AccessKeyMetadata>, PlanError> {
        Ok(Vec::new())
    }

    async fn mfa_devices(&self, _user: &str) -> Result<Vec<MfaDeviceMetadata>, PlanError> {
        Ok(Vec::new())
    }

    async fn has_login_profile(&self, _user: &str) -> Result<bool, PlanError> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_credentials_reports_nothing() {
        let lookup = NoCredentials;
        assert!(lookup.access_keys("alice").await.unwrap().is_empty());
        assert!(lookup.mfa_devices("alice").await.unwrap().is_empty());
        assert!(!lookup.has_login_profile("alice").await.unwrap());
    }
}
