//! CloudFormation-managed resource detection.
//!
//! Grounded on `original_source/iamy/cfn.go`. Two independent checks
//! live here, mirroring the Go split:
//!
//! - `is_skippable_managed_resource` is the cheap heuristic (CFN's
//!   appended random suffix, or an `AWSServiceRole`/`aws-service-role`
//!   name) applied unconditionally while walking IAM/S3 results, the
//!   same way `awsiamfetcher.go`'s `isSkippableManagedResource` is.
//! - `ManagedResourceIndex` is the precise inventory built from
//!   `ListStacks`/`ListStackResources`, used only when accurate
//!   CloudFormation filtering is requested; it falls back to the same
//!   heuristic for any resource it wasn't asked to classify.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use acctsync_common::retry_with_backoff;

use crate::error::CloudError;

fn cfn_suffix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-[A-Z0-9]{10,20}$").expect("static regex"))
}

/// If `name` looks like it's owned by CloudFormation or an AWS service,
/// returns the reason it was skipped.
pub fn is_skippable_managed_resource(name: &str) -> Option<String> {
    if cfn_suffix_regex().is_match(name) {
        return Some(format!("CloudFormation generated resource {name}"));
    }
    if name.contains("AWSServiceRole") || name.contains("aws-service-role") {
        return Some(format!("AWS service role generated resource {name}"));
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfnResourceKind {
    IamPolicy,
    IamRole,
    IamUser,
    IamGroup,
    InstanceProfile,
    S3Bucket,
}

fn resource_kind(resource_type: &str) -> Option<CfnResourceKind> {
    match resource_type {
        "AWS::IAM::Policy" | "AWS::IAM::ManagedPolicy" => Some(CfnResourceKind::IamPolicy),
        "AWS::IAM::Role" => Some(CfnResourceKind::IamRole),
        "AWS::IAM::User" => Some(CfnResourceKind::IamUser),
        "AWS::IAM::Group" => Some(CfnResourceKind::IamGroup),
        "AWS::IAM::InstanceProfile" => Some(CfnResourceKind::InstanceProfile),
        "AWS::S3::Bucket" => Some(CfnResourceKind::S3Bucket),
        _ => None,
    }
}

const ACTIVE_STACK_STATUSES: &[&str] = &[
    "CREATE_IN_PROGRESS",
    "CREATE_COMPLETE",
    "ROLLBACK_COMPLETE",
    "IMPORT_COMPLETE",
    "REVIEW_IN_PROGRESS",
    "UPDATE_ROLLBACK_COMPLETE",
    "UPDATE_IN_PROGRESS",
    "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS",
    "UPDATE_COMPLETE",
    "UPDATE_ROLLBACK_IN_PROGRESS",
    "UPDATE_ROLLBACK_FAILED",
    "UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS",
];

const MAX_THROTTLE_ATTEMPTS: u32 = 8;

/// A precise inventory of every CloudFormation-managed resource in the
/// account, keyed by physical resource name.
#[derive(Debug, Default)]
pub struct ManagedResourceIndex {
    pub(crate) resources: HashMap<String, Vec<CfnResourceKind>>,
}

impl ManagedResourceIndex {
    pub fn is_managed(&self, kind: CfnResourceKind, identifier: &str) -> bool {
        self.resources
            .get(identifier)
            .is_some_and(|kinds| kinds.contains(&kind))
    }
}

fn physical_resource_name(physical_id: &str) -> String {
    if physical_id.starts_with("arn:aws:iam") {
        physical_id
            .rsplit('/')
            .next()
            .unwrap_or(physical_id)
            .to_string()
    } else {
        physical_id.to_string()
    }
}

fn is_throttling(err: &aws_sdk_cloudformation::Error) -> bool {
    err.to_string().contains("Throttling")
}

pub async fn populate_managed_resource_data(
    client: &aws_sdk_cloudformation::Client,
) -> Result<ManagedResourceIndex, CloudError> {
    let mut index = ManagedResourceIndex::default();
    let statuses: Vec<aws_sdk_cloudformation::types::StackStatus> = ACTIVE_STACK_STATUSES
        .iter()
        .map(|s| aws_sdk_cloudformation::types::StackStatus::from(*s))
        .collect();

    let mut stack_token: Option<String> = None;
    loop {
        let statuses = statuses.clone();
        let mut req = client.list_stacks().set_stack_status_filter(Some(statuses));
        if let Some(t) = &stack_token {
            req = req.next_token(t.clone());
        }
        let resp = retry_with_backoff(MAX_THROTTLE_ATTEMPTS, is_throttling, || {
            let req = req.clone();
            async move { req.send().await.map_err(|e| e.into_service_error().into()) }
        })
        .await
        .map_err(|e| CloudError::Cfn(e.to_string()))?;

        for stack in &resp.stack_summaries {
            populate_stack_resources(client, &stack.stack_name, &mut index).await?;
        }

        stack_token = resp.next_token;
        if stack_token.is_none() {
            break;
        }
    }

    Ok(index)
}

async fn populate_stack_resources(
    client: &aws_sdk_cloudformation::Client,
    stack_name: &str,
    index: &mut ManagedResourceIndex,
) -> Result<(), CloudError> {
    let mut resource_token: Option<String> = None;
    loop {
        let mut req = client.list_stack_resources().stack_name(stack_name);
        if let Some(t) = &resource_token {
            req = req.next_token(t.clone());
        }
        let resp = retry_with_backoff(MAX_THROTTLE_ATTEMPTS, is_throttling, || {
            let req = req.clone();
            async move { req.send().await.map_err(|e| e.into_service_error().into()) }
        })
        .await
        .map_err(|e| CloudError::Cfn(e.to_string()))?;

        for resource in &resp.stack_resource_summaries {
            let Some(physical_id) = &resource.physical_resource_id else {
                continue;
            };
            let Some(kind) = resource_kind(&resource.resource_type) else {
                continue;
            };
            let name = physical_resource_name(physical_id);
            index.resources.entry(name).or_default().push(kind);
        }

        resource_token = resp.next_token;
        if resource_token.is_none() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cfn_suffix_is_skippable() {
        assert!(is_skippable_managed_resource("my-role-A1B2C3D4E5").is_some());
    }

    #[test]
    fn service_linked_role_is_skippable() {
        assert!(is_skippable_managed_resource("AWSServiceRoleForSupport").is_some());
    }

    #[test]
    fn ordinary_name_is_not_skippable() {
        assert!(is_skippable_managed_resource("deploy-role").is_none());
    }

    #[test]
    fn physical_resource_name_strips_arn_prefix() {
        assert_eq!(
            physical_resource_name("arn:aws:iam::123456789012:role/my-stack-Role-A1B2C3"),
            "my-stack-Role-A1B2C3"
        );
        assert_eq!(physical_resource_name("my-bucket"), "my-bucket");
    }

    #[test]
    fn managed_policy_and_policy_share_a_namespace() {
        assert_eq!(resource_kind("AWS::IAM::ManagedPolicy"), resource_kind("AWS::IAM::Policy"));
    }

    #[test]
    fn index_reports_managed_resources_by_kind() {
        let mut index = ManagedResourceIndex::default();
        index
            .resources
            .insert("my-role".to_string(), vec![CfnResourceKind::IamRole]);

        assert!(index.is_managed(CfnResourceKind::IamRole, "my-role"));
        assert!(!index.is_managed(CfnResourceKind::IamUser, "my-role"));
        assert!(!index.is_managed(CfnResourceKind::IamRole, "other-role"));
    }
}
