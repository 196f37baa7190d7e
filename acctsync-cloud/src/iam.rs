//! IAM fetch: users, groups, roles, managed policies, instance profiles.
//!
//! Grounded on `original_source/iamy/awsiamfetcher.go`. The Go version
//! pages through a single `GetAccountAuthorizationDetails` call (it
//! returns users/groups/roles/local managed policies with their inline
//! and attached policies already nested) and then separately lists
//! instance profiles; this port keeps that shape. Role and policy
//! descriptions aren't part of that bulk response, so the original
//! backfills them with one goroutine per entity behind a wait group —
//! here that's a `tokio::task::JoinSet` instead.

use std::collections::BTreeSet;

use acctsync_policy::{
    normalize_policy_arn, Account, Group, InlinePolicy, InstanceProfile, ManagedPolicy,
    PolicyVersionMetadata, Role, User,
};
use aws_sdk_iam::types::{GroupDetail, PolicyDetail, PolicyVersion, RoleDetail, UserDetail};

use crate::cfn::is_skippable_managed_resource;
use crate::error::{required, CloudError};

pub struct IamFetchResult {
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub roles: Vec<Role>,
    pub policies: Vec<ManagedPolicy>,
    pub instance_profiles: Vec<InstanceProfile>,
}

pub async fn fetch(
    client: &aws_sdk_iam::Client,
    account: &Account,
    skip_descriptions: bool,
    accurate_cfn: bool,
) -> Result<IamFetchResult, CloudError> {
    let mut users = Vec::new();
    let mut groups = Vec::new();
    let mut roles = Vec::new();
    let mut policies = Vec::new();

    let mut marker: Option<String> = None;
    loop {
        let mut req = client
            .get_account_authorization_details()
            .filter(aws_sdk_iam::types::EntityType::User)
            .filter(aws_sdk_iam::types::EntityType::LocalManagedPolicy)
            .filter(aws_sdk_iam::types::EntityType::Role)
            .filter(aws_sdk_iam::types::EntityType::Group)
            .max_items(1000);
        if let Some(m) = &marker {
            req = req.marker(m.clone());
        }
        let resp = req
            .send()
            .await
            .map_err(|e| CloudError::Iam(e.to_string()))?;

        for user_detail in &resp.user_detail_list {
            if let Some(reason) = skip_reason(user_name_of(user_detail), accurate_cfn) {
                log::debug!("{reason}");
                continue;
            }
            users.push(user_from_detail(account, user_detail)?);
        }
        for group_detail in &resp.group_detail_list {
            if let Some(reason) = skip_reason(&group_detail.group_name, accurate_cfn) {
                log::debug!("{reason}");
                continue;
            }
            groups.push(group_from_detail(account, group_detail)?);
        }
        for role_detail in &resp.role_detail_list {
            if let Some(reason) = skip_reason(&role_detail.role_name, accurate_cfn) {
                log::debug!("{reason}");
                continue;
            }
            roles.push(role_from_detail(account, role_detail)?);
        }
        for policy_detail in &resp.policies {
            if let Some(reason) = skip_reason(policy_name_of(policy_detail), accurate_cfn) {
                log::debug!("{reason}");
                continue;
            }
            policies.push(policy_from_detail(policy_detail)?);
        }

        if resp.is_truncated {
            marker = resp.marker;
        } else {
            break;
        }
    }

    if !skip_descriptions {
        backfill_descriptions(client, account, &mut roles, &mut policies).await?;
    }

    let instance_profiles = fetch_instance_profiles(client, accurate_cfn).await?;

    Ok(IamFetchResult {
        users,
        groups,
        roles,
        policies,
        instance_profiles,
    })
}

/// When the caller asked for the precise CloudFormation inventory
/// (`accurate_cfn`), the name heuristic is bypassed here entirely —
/// `apply_cfn_filter` in `lib.rs` does the actual filtering against
/// that inventory afterward. Applying the heuristic unconditionally
/// would drop resources the precise inventory never classified as
/// managed, which the heuristic alone cannot undo.
fn skip_reason(name: &str, accurate_cfn: bool) -> Option<String> {
    if accurate_cfn {
        return None;
    }
    is_skippable_managed_resource(name)
}

fn user_name_of(detail: &UserDetail) -> &str {
    &detail.user_name
}

fn policy_name_of(detail: &PolicyDetail) -> &str {
    detail.policy_name.as_deref().unwrap_or_default()
}

fn user_from_detail(account: &Account, detail: &UserDetail) -> Result<User, CloudError> {
    let mut inline_policies = Vec::new();
    for ip in &detail.user_policy_list {
        inline_policies.push(inline_policy_from(ip)?);
    }

    let groups = detail.group_list.iter().cloned().collect::<BTreeSet<_>>();
    let attached_policy_refs = detail
        .attached_managed_policies
        .iter()
        .filter_map(|p| p.policy_arn.as_deref())
        .map(|arn| normalize_policy_arn(account, arn))
        .collect::<BTreeSet<_>>();
    let tags = detail
        .tags
        .iter()
        .map(|t| (t.key.clone(), t.value.clone()))
        .collect();

    Ok(User {
        name: detail.user_name.clone(),
        path: detail.path.clone(),
        groups,
        inline_policies,
        attached_policy_refs,
        tags,
    })
}

fn group_from_detail(account: &Account, detail: &GroupDetail) -> Result<Group, CloudError> {
    let mut inline_policies = Vec::new();
    for ip in &detail.group_policy_list {
        inline_policies.push(inline_policy_from(ip)?);
    }
    let attached_policy_refs = detail
        .attached_managed_policies
        .iter()
        .filter_map(|p| p.policy_arn.as_deref())
        .map(|arn| normalize_policy_arn(account, arn))
        .collect::<BTreeSet<_>>();

    Ok(Group {
        name: detail.group_name.clone(),
        path: detail.path.clone(),
        inline_policies,
        attached_policy_refs,
    })
}

fn role_from_detail(account: &Account, detail: &RoleDetail) -> Result<Role, CloudError> {
    let mut inline_policies = Vec::new();
    for ip in &detail.role_policy_list {
        inline_policies.push(inline_policy_from(ip)?);
    }
    let attached_policy_refs = detail
        .attached_managed_policies
        .iter()
        .filter_map(|p| p.policy_arn.as_deref())
        .map(|arn| normalize_policy_arn(account, arn))
        .collect::<BTreeSet<_>>();

    let encoded = required(
        detail.assume_role_policy_document.clone(),
        "RoleDetail.assume_role_policy_document",
    )?;
    let assume_role_policy = acctsync_policy::parse_url_encoded_json(&encoded)?;

    Ok(Role {
        name: detail.role_name.clone(),
        path: detail.path.clone(),
        assume_role_policy,
        inline_policies,
        attached_policy_refs,
        description: None,
    })
}

fn policy_from_detail(detail: &PolicyDetail) -> Result<ManagedPolicy, CloudError> {
    let versions = &detail.policy_version_list;
    let default_version = versions
        .iter()
        .find(|v| v.is_default_version)
        .ok_or_else(|| CloudError::MissingField("PolicyDetail.policy_version_list (default)"))?;
    let encoded = required(
        default_version.document.clone(),
        "PolicyVersion.document",
    )?;
    let policy = acctsync_policy::parse_url_encoded_json(&encoded)?;

    Ok(ManagedPolicy {
        name: required(detail.policy_name.clone(), "PolicyDetail.policy_name")?,
        path: detail.path.clone().unwrap_or_else(|| "/".to_string()),
        policy,
        description: None,
        version_metadata: PolicyVersionMetadata {
            oldest_version_id: oldest_version_id(versions)?,
            nondefault_version_ids: nondefault_version_ids(versions),
            count: versions.len(),
        },
    })
}

fn oldest_version_id(versions: &[PolicyVersion]) -> Result<String, CloudError> {
    versions
        .iter()
        .min_by_key(|v| v.create_date)
        .and_then(|v| v.version_id.clone())
        .ok_or(CloudError::MissingField("PolicyVersion.version_id"))
}

fn nondefault_version_ids(versions: &[PolicyVersion]) -> Vec<String> {
    versions
        .iter()
        .filter(|v| !v.is_default_version)
        .filter_map(|v| v.version_id.clone())
        .collect()
}

fn inline_policy_from(
    detail: &aws_sdk_iam::types::PolicyDetail,
) -> Result<InlinePolicy, CloudError> {
    let name = required(detail.policy_name.clone(), "PolicyDetail.policy_name")?;
    let encoded = required(
        detail.policy_document.clone(),
        "PolicyDetail.policy_document",
    )?;
    let policy = acctsync_policy::parse_url_encoded_json(&encoded)?;
    Ok(InlinePolicy { name, policy })
}

async fn fetch_instance_profiles(
    client: &aws_sdk_iam::Client,
    accurate_cfn: bool,
) -> Result<Vec<InstanceProfile>, CloudError> {
    let mut profiles = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let mut req = client.list_instance_profiles();
        if let Some(m) = &marker {
            req = req.marker(m.clone());
        }
        let resp = req
            .send()
            .await
            .map_err(|e| CloudError::Iam(e.to_string()))?;

        for profile in &resp.instance_profiles {
            if let Some(reason) = skip_reason(&profile.instance_profile_name, accurate_cfn) {
                log::debug!("{reason}");
                continue;
            }
            profiles.push(InstanceProfile {
                name: profile.instance_profile_name.clone(),
                path: profile.path.clone(),
                roles: profile.roles.iter().map(|r| r.role_name.clone()).collect(),
            });
        }

        if resp.is_truncated {
            marker = resp.marker;
        } else {
            break;
        }
    }
    Ok(profiles)
}

async fn backfill_descriptions(
    client: &aws_sdk_iam::Client,
    account: &Account,
    roles: &mut [Role],
    policies: &mut [ManagedPolicy],
) -> Result<(), CloudError> {
    let mut set = tokio::task::JoinSet::new();

    for (idx, role) in roles.iter().enumerate() {
        let client = client.clone();
        let role_name = role.name.clone();
        set.spawn(async move {
            log::debug!("fetching role description for {role_name}");
            let resp = client
                .get_role()
                .role_name(&role_name)
                .send()
                .await
                .map_err(|e| CloudError::Iam(e.to_string()))?;
            let description = required(resp.role, "GetRole.role")?.description;
            Ok::<_, CloudError>((DescribedEntity::Role(idx), description))
        });
    }
    for (idx, policy) in policies.iter().enumerate() {
        let client = client.clone();
        let arn = format!(
            "arn:{}:iam::{}:policy{}{}",
            acctsync_policy::IAM_PARTITION,
            account.id(),
            policy.path,
            policy.name
        );
        let policy_name = policy.name.clone();
        set.spawn(async move {
            log::debug!("fetching policy description for {policy_name}");
            let resp = client
                .get_policy()
                .policy_arn(&arn)
                .send()
                .await
                .map_err(|e| CloudError::Iam(e.to_string()))?;
            let description = required(resp.policy, "GetPolicy.policy")?.description;
            Ok::<_, CloudError>((DescribedEntity::Policy(idx), description))
        });
    }

    let mut outcomes = Vec::new();
    while let Some(result) = set.join_next().await {
        outcomes.push(
            result.map_err(|e| CloudError::Iam(format!("description task panicked: {e}"))),
        );
    }

    let mut first_err = None;
    for outcome in outcomes {
        match outcome.and_then(|inner| inner) {
            Ok((entity, description)) => match entity {
                DescribedEntity::Role(idx) => roles[idx].description = description,
                DescribedEntity::Policy(idx) => policies[idx].description = description,
            },
            Err(e) => first_err.get_or_insert(e),
        };
    }
    if let Some(e) = first_err {
        return Err(e);
    }

    Ok(())
}

enum DescribedEntity {
    Role(usize),
    Policy(usize),
}

#[cfg(test)]
mod tests {
    use super::skip_reason;

    #[test]
    fn heuristic_skips_cfn_shaped_names_by_default() {
        assert!(skip_reason("MyStack-MyRole-AB12CD34EF56", false).is_some());
    }

    #[test]
    fn accurate_cfn_bypasses_the_heuristic_entirely() {
        // With accurate_cfn requested, filtering is deferred to
        // apply_cfn_filter against the real stack-resource inventory;
        // the name heuristic must not drop anything here, or a
        // resource absent from that inventory could never come back.
        assert!(skip_reason("MyStack-MyRole-AB12CD34EF56", true).is_none());
    }
}
