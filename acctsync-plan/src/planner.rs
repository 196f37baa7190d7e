//! The diff planner (C6): compares live (`from`) and desired (`to`)
//! account state and emits an ordered `CmdList`.
//!
//! Grounded on `original_source/iamy/awsdiff.go` (`awsSyncCmdGenerator`,
//! `GenerateCmds`, `updatePolicies`/`updateRoles`/`updateGroups`/
//! `updateUsers`, `inlinePolicySetDifference`, `stringSetDifference`).
//! The Go version runs deletions first; this port moves them to the
//! final phase per the fixed ordering policy, so that every create/
//! update command for an entity precedes any delete command that could
//! otherwise dangle a reference.

use std::collections::BTreeSet;

use acctsync_policy::{
    parse_plain_json, policy_arn_from_ref, Account, AccountData, BucketPolicy, Group,
    InstanceProfile, ManagedPolicy, PolicyDocument, Role, User,
};

use crate::cmd::{Cmd, CmdList};
use crate::credentials::CredentialLookup;
use crate::diff::set_difference;
use crate::error::PlanError;

/// The provider's maximum number of versions retained per managed
/// policy; at this count, creating a new version first requires
/// deleting the oldest.
pub const MANAGED_POLICY_VERSION_LIMIT: usize = 5;

/// Marks a bucket policy file as "no policy desired here" without
/// deleting the file, so a team can record the intent to remove a
/// policy without the planner re-proposing a delete every run once
/// it's actually gone.
pub const BUCKET_POLICY_DELETED_SENTINEL: &str = r#"{"DELETED":true}"#;

fn deleted_sentinel() -> PolicyDocument {
    parse_plain_json(BUCKET_POLICY_DELETED_SENTINEL).expect("sentinel is valid JSON")
}

fn is_deleted_sentinel(doc: &PolicyDocument) -> bool {
    *doc == deleted_sentinel()
}

fn path_or_root(p: &str) -> &str {
    if p.is_empty() {
        "/"
    } else {
        p
    }
}

fn arg(s: impl Into<String>) -> String {
    s.into()
}

/// Computes the full reconciliation plan. `credentials` backs the
/// deletion phase's access-key/MFA/login-profile cleanup lookups.
pub async fn plan(
    from: &AccountData,
    to: &AccountData,
    credentials: &dyn CredentialLookup,
) -> Result<CmdList, PlanError> {
    let mut cmds = CmdList::new();

    plan_policies(from, to, &mut cmds);
    plan_roles(from, to, &mut cmds);
    plan_groups(from, to, &mut cmds);
    plan_users(from, to, &mut cmds);
    plan_instance_profiles(from, to, &mut cmds);
    plan_bucket_policies(from, to, &mut cmds);
    plan_deletions(from, to, credentials, &mut cmds).await?;

    log::debug!(
        "planned {} commands ({} destructive) for account {}",
        cmds.len(),
        cmds.destructive_count(),
        to.account
    );

    Ok(cmds)
}

fn plan_policies(from: &AccountData, to: &AccountData, cmds: &mut CmdList) {
    for to_policy in &to.policies {
        match from.find_policy(&to_policy.name, &to_policy.path) {
            Some(from_policy) if from_policy.policy != to_policy.policy => {
                if from_policy.version_metadata.count >= MANAGED_POLICY_VERSION_LIMIT {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("delete-policy-version"),
                        arg("--policy-arn"),
                        to.policy_arn(&to_policy.name, &to_policy.path),
                        arg("--version-id"),
                        from_policy.version_metadata.oldest_version_id.clone(),
                    ]));
                }
                cmds.push(Cmd::aws(vec![
                    arg("iam"),
                    arg("create-policy-version"),
                    arg("--policy-arn"),
                    to.policy_arn(&to_policy.name, &to_policy.path),
                    arg("--set-as-default"),
                    arg("--policy-document"),
                    to_policy.policy.render_compact_json(),
                ]));
            }
            Some(_) => {}
            None => create_policy(to_policy, cmds),
        }
    }
}

fn create_policy(policy: &ManagedPolicy, cmds: &mut CmdList) {
    let mut args = vec![
        arg("iam"),
        arg("create-policy"),
        arg("--policy-name"),
        policy.name.clone(),
        arg("--path"),
        path_or_root(&policy.path).to_string(),
        arg("--policy-document"),
        policy.policy.render_compact_json(),
    ];
    if let Some(description) = &policy.description {
        args.push(arg("--description"));
        args.push(description.clone());
    }
    cmds.push(Cmd::aws(args));
}

fn plan_roles(from: &AccountData, to: &AccountData, cmds: &mut CmdList) {
    for to_role in &to.roles {
        match from.find_role(&to_role.name, &to_role.path) {
            Some(from_role) => {
                if from_role.assume_role_policy != to_role.assume_role_policy {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("update-assume-role-policy"),
                        arg("--role-name"),
                        to_role.name.clone(),
                        arg("--policy-document"),
                        to_role.assume_role_policy.render_compact_json(),
                    ]));
                }

                for removed in set_difference(&from_role.inline_policies, &to_role.inline_policies) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("delete-role-policy"),
                        arg("--role-name"),
                        to_role.name.clone(),
                        arg("--policy-name"),
                        removed.name.clone(),
                    ]));
                }
                for added in set_difference(&to_role.inline_policies, &from_role.inline_policies) {
                    cmds.push(put_role_policy(&to_role.name, added));
                }

                for removed in from_role.attached_policy_refs.difference(&to_role.attached_policy_refs) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("detach-role-policy"),
                        arg("--role-name"),
                        to_role.name.clone(),
                        arg("--policy-arn"),
                        policy_arn_from_ref(&to.account, removed),
                    ]));
                }
                for added in to_role.attached_policy_refs.difference(&from_role.attached_policy_refs) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("attach-role-policy"),
                        arg("--role-name"),
                        to_role.name.clone(),
                        arg("--policy-arn"),
                        policy_arn_from_ref(&to.account, added),
                    ]));
                }
            }
            None => {
                cmds.push(Cmd::aws(vec![
                    arg("iam"),
                    arg("create-role"),
                    arg("--role-name"),
                    to_role.name.clone(),
                    arg("--path"),
                    path_or_root(&to_role.path).to_string(),
                    arg("--assume-role-policy-document"),
                    to_role.assume_role_policy.render_compact_json(),
                ]));
                for ip in &to_role.inline_policies {
                    cmds.push(put_role_policy(&to_role.name, ip));
                }
                for policy_ref in &to_role.attached_policy_refs {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("attach-role-policy"),
                        arg("--role-name"),
                        to_role.name.clone(),
                        arg("--policy-arn"),
                        policy_arn_from_ref(&to.account, policy_ref),
                    ]));
                }
            }
        }
    }
}

fn put_role_policy(role_name: &str, ip: &acctsync_policy::InlinePolicy) -> Cmd {
    Cmd::aws(vec![
        arg("iam"),
        arg("put-role-policy"),
        arg("--role-name"),
        role_name.to_string(),
        arg("--policy-name"),
        ip.name.clone(),
        arg("--policy-document"),
        ip.policy.render_compact_json(),
    ])
}

fn plan_groups(from: &AccountData, to: &AccountData, cmds: &mut CmdList) {
    for to_group in &to.groups {
        match from.find_group(&to_group.name, &to_group.path) {
            Some(from_group) => {
                for removed in set_difference(&from_group.inline_policies, &to_group.inline_policies) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("delete-group-policy"),
                        arg("--group-name"),
                        to_group.name.clone(),
                        arg("--policy-name"),
                        removed.name.clone(),
                    ]));
                }
                for added in set_difference(&to_group.inline_policies, &from_group.inline_policies) {
                    cmds.push(put_group_policy(&to_group.name, added));
                }

                for removed in from_group.attached_policy_refs.difference(&to_group.attached_policy_refs) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("detach-group-policy"),
                        arg("--group-name"),
                        to_group.name.clone(),
                        arg("--policy-arn"),
                        policy_arn_from_ref(&to.account, removed),
                    ]));
                }
                for added in to_group.attached_policy_refs.difference(&from_group.attached_policy_refs) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("attach-group-policy"),
                        arg("--group-name"),
                        to_group.name.clone(),
                        arg("--policy-arn"),
                        policy_arn_from_ref(&to.account, added),
                    ]));
                }
            }
            None => {
                cmds.push(Cmd::aws(vec![
                    arg("iam"),
                    arg("create-group"),
                    arg("--group-name"),
                    to_group.name.clone(),
                    arg("--path"),
                    path_or_root(&to_group.path).to_string(),
                ]));
                for ip in &to_group.inline_policies {
                    cmds.push(put_group_policy(&to_group.name, ip));
                }
                for policy_ref in &to_group.attached_policy_refs {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("attach-group-policy"),
                        arg("--group-name"),
                        to_group.name.clone(),
                        arg("--policy-arn"),
                        policy_arn_from_ref(&to.account, policy_ref),
                    ]));
                }
            }
        }
    }
}

fn put_group_policy(group_name: &str, ip: &acctsync_policy::InlinePolicy) -> Cmd {
    Cmd::aws(vec![
        arg("iam"),
        arg("put-group-policy"),
        arg("--group-name"),
        group_name.to_string(),
        arg("--policy-name"),
        ip.name.clone(),
        arg("--policy-document"),
        ip.policy.render_compact_json(),
    ])
}

fn plan_users(from: &AccountData, to: &AccountData, cmds: &mut CmdList) {
    for to_user in &to.users {
        match from.find_user(&to_user.name, &to_user.path) {
            Some(from_user) => {
                for removed in from_user.groups.difference(&to_user.groups) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("remove-user-from-group"),
                        arg("--user-name"),
                        to_user.name.clone(),
                        arg("--group-name"),
                        removed.clone(),
                    ]));
                }
                for added in to_user.groups.difference(&from_user.groups) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("add-user-to-group"),
                        arg("--user-name"),
                        to_user.name.clone(),
                        arg("--group-name"),
                        added.clone(),
                    ]));
                }

                for removed in set_difference(&from_user.inline_policies, &to_user.inline_policies) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("delete-user-policy"),
                        arg("--user-name"),
                        to_user.name.clone(),
                        arg("--policy-name"),
                        removed.name.clone(),
                    ]));
                }
                for added in set_difference(&to_user.inline_policies, &from_user.inline_policies) {
                    cmds.push(put_user_policy(&to_user.name, added));
                }

                for removed in from_user.attached_policy_refs.difference(&to_user.attached_policy_refs) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("detach-user-policy"),
                        arg("--user-name"),
                        to_user.name.clone(),
                        arg("--policy-arn"),
                        policy_arn_from_ref(&to.account, removed),
                    ]));
                }
                for added in to_user.attached_policy_refs.difference(&from_user.attached_policy_refs) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("attach-user-policy"),
                        arg("--user-name"),
                        to_user.name.clone(),
                        arg("--policy-arn"),
                        policy_arn_from_ref(&to.account, added),
                    ]));
                }

                plan_tag_diff(&to_user.name, &from_user.tags, &to_user.tags, cmds);
            }
            None => {
                cmds.push(Cmd::aws(vec![
                    arg("iam"),
                    arg("create-user"),
                    arg("--user-name"),
                    to_user.name.clone(),
                    arg("--path"),
                    path_or_root(&to_user.path).to_string(),
                ]));
                for group in &to_user.groups {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("add-user-to-group"),
                        arg("--user-name"),
                        to_user.name.clone(),
                        arg("--group-name"),
                        group.clone(),
                    ]));
                }
                for ip in &to_user.inline_policies {
                    cmds.push(put_user_policy(&to_user.name, ip));
                }
                for policy_ref in &to_user.attached_policy_refs {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("attach-user-policy"),
                        arg("--user-name"),
                        to_user.name.clone(),
                        arg("--policy-arn"),
                        policy_arn_from_ref(&to.account, policy_ref),
                    ]));
                }
                plan_tag_diff(&to_user.name, &Default::default(), &to_user.tags, cmds);
            }
        }
    }
}

fn put_user_policy(user_name: &str, ip: &acctsync_policy::InlinePolicy) -> Cmd {
    Cmd::aws(vec![
        arg("iam"),
        arg("put-user-policy"),
        arg("--user-name"),
        user_name.to_string(),
        arg("--policy-name"),
        ip.name.clone(),
        arg("--policy-document"),
        ip.policy.render_compact_json(),
    ])
}

fn plan_tag_diff(
    user_name: &str,
    from_tags: &std::collections::BTreeMap<String, String>,
    to_tags: &std::collections::BTreeMap<String, String>,
    cmds: &mut CmdList,
) {
    let mut changed_or_new = Vec::new();
    for (key, value) in to_tags {
        if from_tags.get(key) != Some(value) {
            changed_or_new.push((key.clone(), value.clone()));
        }
    }
    if !changed_or_new.is_empty() {
        let mut args = vec![arg("iam"), arg("tag-user"), arg("--user-name"), user_name.to_string(), arg("--tags")];
        for (key, value) in changed_or_new {
            args.push(format!("Key={key},Value={value}"));
        }
        cmds.push(Cmd::aws(args));
    }

    let removed_keys: Vec<&String> = from_tags.keys().filter(|k| !to_tags.contains_key(*k)).collect();
    if !removed_keys.is_empty() {
        let mut args = vec![
            arg("iam"),
            arg("untag-user"),
            arg("--user-name"),
            user_name.to_string(),
            arg("--tag-keys"),
        ];
        args.extend(removed_keys.into_iter().cloned());
        cmds.push(Cmd::aws(args));
    }
}

fn plan_instance_profiles(from: &AccountData, to: &AccountData, cmds: &mut CmdList) {
    for to_profile in &to.instance_profiles {
        match from.find_instance_profile(&to_profile.name, &to_profile.path) {
            Some(from_profile) => {
                for removed in set_difference(&from_profile.roles, &to_profile.roles) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("remove-role-from-instance-profile"),
                        arg("--instance-profile-name"),
                        to_profile.name.clone(),
                        arg("--role-name"),
                        removed.clone(),
                    ]));
                }
                for added in set_difference(&to_profile.roles, &from_profile.roles) {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("add-role-to-instance-profile"),
                        arg("--instance-profile-name"),
                        to_profile.name.clone(),
                        arg("--role-name"),
                        added.clone(),
                    ]));
                }
            }
            None => {
                cmds.push(Cmd::aws(vec![
                    arg("iam"),
                    arg("create-instance-profile"),
                    arg("--instance-profile-name"),
                    to_profile.name.clone(),
                    arg("--path"),
                    path_or_root(&to_profile.path).to_string(),
                ]));
                for role in &to_profile.roles {
                    cmds.push(Cmd::aws(vec![
                        arg("iam"),
                        arg("add-role-to-instance-profile"),
                        arg("--instance-profile-name"),
                        to_profile.name.clone(),
                        arg("--role-name"),
                        role.clone(),
                    ]));
                }
            }
        }
    }
}

fn plan_bucket_policies(from: &AccountData, to: &AccountData, cmds: &mut CmdList) {
    for to_bucket in to.bucket_policies.iter().filter(|bp| !is_deleted_sentinel(&bp.policy)) {
        match from.find_bucket_policy(&to_bucket.bucket_name) {
            Some(from_bucket) if from_bucket.policy == to_bucket.policy => {}
            _ => cmds.push(put_bucket_policy(to_bucket)),
        }
    }

    for from_bucket in &from.bucket_policies {
        let still_desired = to.bucket_policies.iter().any(|b| {
            b.bucket_name == from_bucket.bucket_name && !is_deleted_sentinel(&b.policy)
        });
        if !still_desired {
            cmds.push(Cmd::aws(vec![
                arg("s3api"),
                arg("delete-bucket-policy"),
                arg("--bucket"),
                from_bucket.bucket_name.clone(),
            ]));
        }
    }
}

fn put_bucket_policy(bp: &BucketPolicy) -> Cmd {
    Cmd::aws(vec![
        arg("s3api"),
        arg("put-bucket-policy"),
        arg("--bucket"),
        bp.bucket_name.clone(),
        arg("--policy"),
        bp.policy.render_compact_json(),
    ])
}

async fn plan_deletions(
    from: &AccountData,
    to: &AccountData,
    credentials: &dyn CredentialLookup,
    cmds: &mut CmdList,
) -> Result<(), PlanError> {
    for user in &from.users {
        if to.find_user(&user.name, &user.path).is_none() {
            plan_user_deletion(&from.account, user, credentials, cmds).await?;
        }
    }
    for role in &from.roles {
        if to.find_role(&role.name, &role.path).is_none() {
            plan_role_deletion(&from.account, role, cmds);
        }
    }
    for group in &from.groups {
        if to.find_group(&group.name, &group.path).is_none() {
            plan_group_deletion(&from.account, group, cmds);
        }
    }
    for policy in &from.policies {
        if to.find_policy(&policy.name, &policy.path).is_none() {
            plan_policy_deletion(from, policy, cmds);
        }
    }
    for profile in &from.instance_profiles {
        if to.find_instance_profile(&profile.name, &profile.path).is_none() {
            cmds.push(Cmd::aws(vec![
                arg("iam"),
                arg("delete-instance-profile"),
                arg("--instance-profile-name"),
                profile.name.clone(),
            ]));
        }
    }

    Ok(())
}

async fn plan_user_deletion(
    account: &Account,
    user: &User,
    credentials: &dyn CredentialLookup,
    cmds: &mut CmdList,
) -> Result<(), PlanError> {
    for key in credentials.access_keys(&user.name).await? {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("delete-access-key"),
            arg("--user-name"),
            user.name.clone(),
            arg("--access-key-id"),
            key.id,
        ]));
    }

    for device in credentials.mfa_devices(&user.name).await? {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("deactivate-mfa-device"),
            arg("--user-name"),
            user.name.clone(),
            arg("--serial-number"),
            device.serial_number.clone(),
        ]));
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("delete-virtual-mfa-device"),
            arg("--serial-number"),
            device.serial_number,
        ]));
    }

    if credentials.has_login_profile(&user.name).await? {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("delete-login-profile"),
            arg("--user-name"),
            user.name.clone(),
        ]));
    }

    for group in &user.groups {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("remove-user-from-group"),
            arg("--user-name"),
            user.name.clone(),
            arg("--group-name"),
            group.clone(),
        ]));
    }
    for policy_ref in &user.attached_policy_refs {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("detach-user-policy"),
            arg("--user-name"),
            user.name.clone(),
            arg("--policy-arn"),
            policy_arn_from_ref(account, policy_ref),
        ]));
    }
    for ip in &user.inline_policies {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("delete-user-policy"),
            arg("--user-name"),
            user.name.clone(),
            arg("--policy-name"),
            ip.name.clone(),
        ]));
    }

    cmds.push(Cmd::aws(vec![arg("iam"), arg("delete-user"), arg("--user-name"), user.name.clone()]));
    Ok(())
}

fn plan_role_deletion(account: &Account, role: &Role, cmds: &mut CmdList) {
    for policy_ref in &role.attached_policy_refs {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("detach-role-policy"),
            arg("--role-name"),
            role.name.clone(),
            arg("--policy-arn"),
            policy_arn_from_ref(account, policy_ref),
        ]));
    }
    for ip in &role.inline_policies {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("delete-role-policy"),
            arg("--role-name"),
            role.name.clone(),
            arg("--policy-name"),
            ip.name.clone(),
        ]));
    }
    cmds.push(Cmd::aws(vec![arg("iam"), arg("delete-role"), arg("--role-name"), role.name.clone()]));
}

fn plan_group_deletion(account: &Account, group: &Group, cmds: &mut CmdList) {
    for policy_ref in &group.attached_policy_refs {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("detach-group-policy"),
            arg("--group-name"),
            group.name.clone(),
            arg("--policy-arn"),
            policy_arn_from_ref(account, policy_ref),
        ]));
    }
    for ip in &group.inline_policies {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("delete-group-policy"),
            arg("--group-name"),
            group.name.clone(),
            arg("--policy-name"),
            ip.name.clone(),
        ]));
    }
    cmds.push(Cmd::aws(vec![arg("iam"), arg("delete-group"), arg("--group-name"), group.name.clone()]));
}

fn plan_policy_deletion(to: &AccountData, policy: &ManagedPolicy, cmds: &mut CmdList) {
    let arn = to.policy_arn(&policy.name, &policy.path);
    for version_id in &policy.version_metadata.nondefault_version_ids {
        cmds.push(Cmd::aws(vec![
            arg("iam"),
            arg("delete-policy-version"),
            arg("--policy-arn"),
            arn.clone(),
            arg("--version-id"),
            version_id.clone(),
        ]));
    }
    cmds.push(Cmd::aws(vec![arg("iam"), arg("delete-policy"), arg("--policy-arn"), arn]));
}
