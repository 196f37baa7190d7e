//! Canonical account entity model (C2).
//!
//! Grounded on `original_source/iamy/models.go` (`User`, `Group`, `Role`,
//! `Policy`, `BucketPolicy`, `AccountData`, `arnFor`,
//! `normalisePolicyArn`, `policyArnFromString`) — the donor's Go structs
//! map near 1:1 onto Rust structs; set-valued fields (`groups`,
//! `attached_policy_refs`) become `BTreeSet` rather than `Vec` so the
//! planner's set-difference operations (spec.md §4.6) have no duplicate
//! or ordering concerns to worry about.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::codec::PolicyDocument;

pub const IAM_PARTITION: &str = "aws";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlinePolicy {
    pub name: String,
    pub policy: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyVersionMetadata {
    pub oldest_version_id: String,
    pub nondefault_version_ids: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedPolicy {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    pub policy: PolicyDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_default_version_metadata")]
    pub version_metadata: PolicyVersionMetadata,
}

fn is_default_version_metadata(v: &PolicyVersionMetadata) -> bool {
    *v == PolicyVersionMetadata::default()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    pub groups: BTreeSet<String>,
    pub inline_policies: Vec<InlinePolicy>,
    pub attached_policy_refs: BTreeSet<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    pub inline_policies: Vec<InlinePolicy>,
    pub attached_policy_refs: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    pub assume_role_policy: PolicyDocument,
    #[serde(default)]
    pub inline_policies: Vec<InlinePolicy>,
    #[serde(default)]
    pub attached_policy_refs: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceProfile {
    #[serde(skip)]
    pub name: String,
    #[serde(skip)]
    pub path: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPolicy {
    #[serde(skip)]
    pub bucket_name: String,
    pub policy: PolicyDocument,
}

#[derive(Debug, Clone, Default)]
pub struct AccountData {
    pub account: Account,
    pub users: Vec<User>,
    pub groups: Vec<Group>,
    pub roles: Vec<Role>,
    pub policies: Vec<ManagedPolicy>,
    pub instance_profiles: Vec<InstanceProfile>,
    pub bucket_policies: Vec<BucketPolicy>,
}

impl Default for Account {
    fn default() -> Self {
        Account::new("000000000000", None)
    }
}

impl AccountData {
    pub fn new(account: Account) -> Self {
        AccountData {
            account,
            users: Vec::new(),
            groups: Vec::new(),
            roles: Vec::new(),
            policies: Vec::new(),
            instance_profiles: Vec::new(),
            bucket_policies: Vec::new(),
        }
    }

    pub fn find_user(&self, name: &str, path: &str) -> Option<&User> {
        self.users.iter().find(|u| u.name == name && u.path == path)
    }

    pub fn find_group(&self, name: &str, path: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name && g.path == path)
    }

    pub fn find_role(&self, name: &str, path: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name && r.path == path)
    }

    pub fn find_policy(&self, name: &str, path: &str) -> Option<&ManagedPolicy> {
        self.policies.iter().find(|p| p.name == name && p.path == path)
    }

    pub fn find_instance_profile(&self, name: &str, path: &str) -> Option<&InstanceProfile> {
        self.instance_profiles
            .iter()
            .find(|p| p.name == name && p.path == path)
    }

    pub fn find_bucket_policy(&self, bucket_name: &str) -> Option<&BucketPolicy> {
        self.bucket_policies
            .iter()
            .find(|b| b.bucket_name == bucket_name)
    }

    /// The ARN of a managed policy identified by (name, path), in this
    /// account.
    pub fn policy_arn(&self, name: &str, path: &str) -> String {
        let path = if path.is_empty() { "/" } else { path };
        format!(
            "arn:{}:iam::{}:policy{}{}",
            IAM_PARTITION,
            self.account.id(),
            path,
            name
        )
    }
}

/// If `arn` belongs to this account, strip the
/// `arn:<partition>:iam::<id>:policy/` prefix, leaving a bare name;
/// otherwise return it unchanged. This is the sole mechanism for
/// recognising a locally-owned managed policy reference.
pub fn normalize_policy_arn(account: &Account, arn: &str) -> String {
    let prefix = format!("arn:{}:iam::{}:policy/", IAM_PARTITION, account.id());
    arn.strip_prefix(&prefix).map(str::to_string).unwrap_or_else(|| arn.to_string())
}

/// Inverse of `normalize_policy_arn`: if `reference` is already an ARN,
/// return it verbatim; otherwise construct the full ARN for a local
/// managed policy with that bare name.
pub fn policy_arn_from_ref(account: &Account, reference: &str) -> String {
    if reference.starts_with("arn:") {
        reference.to_string()
    } else {
        format!("arn:{}:iam::{}:policy/{}", IAM_PARTITION, account.id(), reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_plain_json;

    fn account() -> Account {
        Account::new("123456789012", None)
    }

    #[test]
    fn normalize_strips_local_policy_arn() {
        let acct = account();
        let arn = "arn:aws:iam::123456789012:policy/my-policy";
        assert_eq!(normalize_policy_arn(&acct, arn), "my-policy");
    }

    #[test]
    fn normalize_keeps_foreign_account_arn() {
        let acct = account();
        let arn = "arn:aws:iam::999999999999:policy/my-policy";
        assert_eq!(normalize_policy_arn(&acct, arn), arn);
    }

    #[test]
    fn ref_round_trips_through_normalize() {
        let acct = account();
        let full = policy_arn_from_ref(&acct, "my-policy");
        assert_eq!(full, "arn:aws:iam::123456789012:policy/my-policy");
        assert_eq!(normalize_policy_arn(&acct, &full), "my-policy");
    }

    #[test]
    fn ref_passes_through_existing_arns() {
        let acct = account();
        let arn = "arn:aws:iam::999999999999:policy/shared";
        assert_eq!(policy_arn_from_ref(&acct, arn), arn);
    }

    #[test]
    fn find_operations_match_on_name_and_path() {
        let mut data = AccountData::new(account());
        data.users.push(User {
            name: "alice".into(),
            path: "/eng/".into(),
            ..Default::default()
        });

        assert!(data.find_user("alice", "/eng/").is_some());
        assert!(data.find_user("alice", "/").is_none());
        assert!(data.find_user("bob", "/eng/").is_none());
    }

    #[test]
    fn unique_within_kind_name_path_pairs() {
        let mut data = AccountData::new(account());
        data.policies.push(ManagedPolicy {
            name: "p".into(),
            path: "/".into(),
            policy: parse_plain_json(r#"{"Version":"2012-10-17","Statement":[]}"#).unwrap(),
            description: None,
            version_metadata: PolicyVersionMetadata::default(),
        });
        assert!(data.find_policy("p", "/").is_some());
        assert!(data.find_policy("p", "/other/").is_none());
    }
}
