//! Live `CredentialLookup` backed by IAM, used on the `push` path.
//!
//! Kept in the binary crate rather than `acctsync-cloud` so the planner
//! never has to depend on a concrete AWS SDK; `acctsync-cloud` fetches
//! declarative state, this answers the narrower "what credentials does
//! this user still hold" question the deletion phase needs.

use async_trait::async_trait;

use acctsync_plan::{AccessKeyMetadata, CredentialLookup, MfaDeviceMetadata, PlanError};

pub struct IamCredentialLookup {
    client: aws_sdk_iam::Client,
}

impl IamCredentialLookup {
    pub fn new(client: aws_sdk_iam::Client) -> Self {
        IamCredentialLookup { client }
    }
}

fn lookup_error(user: &str, message: impl std::fmt::Display) -> PlanError {
    PlanError::CredentialLookup {
        user: user.to_string(),
        message: message.to_string(),
    }
}

#[async_trait]
impl CredentialLookup for IamCredentialLookup {
    async fn access_keys(&self, user: &str) -> Result<Vec<AccessKeyMetadata>, PlanError> {
        let resp = self
            .client
            .list_access_keys()
            .user_name(user)
            .send()
            .await
            .map_err(|e| lookup_error(user, e))?;

        Ok(resp
            .access_key_metadata
            .into_iter()
            .filter_map(|k| k.access_key_id)
            .map(|id| AccessKeyMetadata { id })
            .collect())
    }

    async fn mfa_devices(&self, user: &str) -> Result<Vec<MfaDeviceMetadata>, PlanError> {
        let resp = self
            .client
            .list_mfa_devices()
            .user_name(user)
            .send()
            .await
            .map_err(|e| lookup_error(user, e))?;

        Ok(resp
            .mfa_devices
            .into_iter()
            .map(|d| MfaDeviceMetadata {
                serial_number: d.serial_number,
            })
            .collect())
    }

    async fn has_login_profile(&self, user: &str) -> Result<bool, PlanError> {
        match self.client.get_login_profile().user_name(user).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                let svc = e.as_service_error();
                if svc.is_some_and(|e| e.is_no_such_entity_exception()) {
                    Ok(false)
                } else {
                    Err(lookup_error(user, e))
                }
            }
        }
    }
}
