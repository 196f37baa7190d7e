//! Fetches the live account entity model (C4/C5): IAM via
//! `GetAccountAuthorizationDetails`, S3 bucket policies, and an optional
//! CloudFormation-managed-resource filter.

mod account_id;
mod cfn;
mod error;
mod iam;
mod s3;

pub use account_id::resolve_account_id;
pub use cfn::{is_skippable_managed_resource, CfnResourceKind, ManagedResourceIndex};
pub use error::CloudError;

use acctsync_policy::{Account, AccountData};

/// Tag conventionally applied by CloudFormation to every resource it
/// creates; `--skip-cfn-tagged` is sugar for adding this to
/// `skip_tag_keys`.
pub const CLOUDFORMATION_STACK_TAG: &str = "aws:cloudformation:stack-name";

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Skip the per-role/per-policy description backfill (used on the
    /// `push` path, where descriptions don't affect the diff).
    pub skip_descriptions: bool,
    /// Build the precise CloudFormation managed-resource inventory
    /// instead of relying solely on the name-heuristic filter.
    pub accurate_cfn: bool,
    /// Entities carrying any of these tag keys are dropped from the
    /// fetched snapshot.
    pub skip_tag_keys: Vec<String>,
}

pub struct Fetcher {
    iam: aws_sdk_iam::Client,
    sts: aws_sdk_sts::Client,
    s3: aws_sdk_s3::Client,
    cfn: aws_sdk_cloudformation::Client,
    ec2: aws_sdk_ec2::Client,
    config: aws_config::SdkConfig,
}

impl Fetcher {
    pub fn new(config: aws_config::SdkConfig) -> Self {
        Fetcher {
            iam: aws_sdk_iam::Client::new(&config),
            sts: aws_sdk_sts::Client::new(&config),
            s3: aws_sdk_s3::Client::new(&config),
            cfn: aws_sdk_cloudformation::Client::new(&config),
            ec2: aws_sdk_ec2::Client::new(&config),
            config,
        }
    }

    /// Resolves the account id behind these credentials.
    pub async fn account_id(&self) -> Result<String, CloudError> {
        resolve_account_id(&self.iam, &self.sts, &self.ec2).await
    }

    pub async fn fetch(&self, opts: &FetchOptions) -> Result<AccountData, CloudError> {
        let account_id = self.account_id().await?;
        let account = Account::new(account_id, None);

        let (iam_result, bucket_policies) = tokio::try_join!(
            iam::fetch(
                &self.iam,
                &account,
                opts.skip_descriptions,
                opts.accurate_cfn
            ),
            s3::fetch(&self.s3, &self.config),
        )?;

        let mut data = AccountData::new(account);
        data.users = iam_result.users;
        data.groups = iam_result.groups;
        data.roles = iam_result.roles;
        data.policies = iam_result.policies;
        data.instance_profiles = iam_result.instance_profiles;
        data.bucket_policies = bucket_policies;

        if opts.accurate_cfn {
            let index = cfn::populate_managed_resource_data(&self.cfn).await?;
            apply_cfn_filter(&mut data, &index);
        }

        if !opts.skip_tag_keys.is_empty() {
            data.users
                .retain(|u| !u.tags.keys().any(|k| opts.skip_tag_keys.contains(k)));
        }

        Ok(data)
    }
}

fn apply_cfn_filter(data: &mut AccountData, index: &ManagedResourceIndex) {
    data.users
        .retain(|u| !index.is_managed(CfnResourceKind::IamUser, &u.name));
    data.groups
        .retain(|g| !index.is_managed(CfnResourceKind::IamGroup, &g.name));
    data.roles
        .retain(|r| !index.is_managed(CfnResourceKind::IamRole, &r.name));
    data.policies
        .retain(|p| !index.is_managed(CfnResourceKind::IamPolicy, &p.name));
    data.instance_profiles
        .retain(|p| !index.is_managed(CfnResourceKind::InstanceProfile, &p.name));
    data.bucket_policies
        .retain(|b| !index.is_managed(CfnResourceKind::S3Bucket, &b.bucket_name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use acctsync_policy::User;

    fn sample_data() -> AccountData {
        let mut data = AccountData::new(Account::new("123456789012", None));
        data.users.push(User {
            name: "cfn-user".into(),
            ..Default::default()
        });
        data.users.push(User {
            name: "regular-user".into(),
            ..Default::default()
        });
        data
    }

    #[test]
    fn cfn_filter_drops_only_indexed_resources() {
        let mut data = sample_data();
        let mut index = ManagedResourceIndex::default();
        index
            .resources
            .insert("cfn-user".to_string(), vec![CfnResourceKind::IamUser]);

        apply_cfn_filter(&mut data, &index);

        assert_eq!(data.users.len(), 1);
        assert_eq!(data.users[0].name, "regular-user");
    }

    #[test]
    fn skip_tag_filter_is_applied_after_fetch_options() {
        let skip_keys = vec!["do-not-manage".to_string()];
        let mut data = sample_data();
        data.users[0]
            .tags
            .insert("do-not-manage".to_string(), "true".to_string());

        data.users
            .retain(|u| !u.tags.keys().any(|k| skip_keys.contains(k)));

        assert_eq!(data.users.len(), 1);
        assert_eq!(data.users[0].name, "regular-user");
    }
}
