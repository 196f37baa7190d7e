//! Determining the AWS account id backing a session (C4).
//!
//! Grounded on `original_source/iamy/awsaccountid.go`'s `GetAwsAccountId`:
//! the same `GetUser` -> `ListUsers` -> `DescribeSecurityGroups` fallback
//! chain, with STS `GetCallerIdentity` added ahead of it as the first
//! tier — it answers the question directly rather than by inference from
//! an ARN, so it's tried before the ARN-scraping strategies the original
//! relies on (see DESIGN.md).

use crate::error::{required, CloudError};

fn account_id_from_arn(arn: &str) -> Option<String> {
    arn.split(':').nth(4).map(str::to_string)
}

async fn via_get_user(iam: &aws_sdk_iam::Client) -> Result<String, CloudError> {
    let resp = iam
        .get_user()
        .send()
        .await
        .map_err(|e| CloudError::Iam(e.to_string()))?;
    let user = required(resp.user, "GetUser.user")?;
    account_id_from_arn(&user.arn).ok_or_else(|| {
        CloudError::AccountIdUnresolved(format!("malformed user arn: {}", user.arn))
    })
}

async fn via_list_users(iam: &aws_sdk_iam::Client) -> Result<String, CloudError> {
    let resp = iam
        .list_users()
        .send()
        .await
        .map_err(|e| CloudError::Iam(e.to_string()))?;
    let first = resp
        .users
        .first()
        .ok_or_else(|| CloudError::AccountIdUnresolved("account has no IAM users".into()))?;
    account_id_from_arn(&first.arn).ok_or_else(|| {
        CloudError::AccountIdUnresolved(format!("malformed user arn: {}", first.arn))
    })
}

async fn via_get_caller_identity(sts: &aws_sdk_sts::Client) -> Result<String, CloudError> {
    let resp = sts
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| CloudError::Sts(e.to_string()))?;
    required(resp.account, "GetCallerIdentity.account")
}

async fn via_default_security_group(ec2: &aws_sdk_ec2::Client) -> Result<String, CloudError> {
    let resp = ec2
        .describe_security_groups()
        .group_names("default")
        .send()
        .await
        .map_err(|e| CloudError::Ec2(e.to_string()))?;
    let group = resp
        .security_groups
        .first()
        .ok_or_else(|| CloudError::AccountIdUnresolved("no default security group found".into()))?;
    required(group.owner_id.clone(), "SecurityGroup.owner_id")
}

/// Resolves the 12-digit account id for the credentials behind
/// `iam`/`sts`/`ec2`, trying each strategy in turn and only giving up
/// once all have failed.
pub async fn resolve_account_id(
    iam: &aws_sdk_iam::Client,
    sts: &aws_sdk_sts::Client,
    ec2: &aws_sdk_ec2::Client,
) -> Result<String, CloudError> {
    if let Ok(id) = via_get_caller_identity(sts).await {
        return Ok(id);
    }
    if let Ok(id) = via_get_user(iam).await {
        return Ok(id);
    }
    if let Ok(id) = via_list_users(iam).await {
        return Ok(id);
    }
    via_default_security_group(ec2).await.map_err(|e| {
        CloudError::AccountIdUnresolved(format!(
            "all account id resolution strategies failed; last error: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_account_id_from_well_formed_arn() {
        let arn = "arn:aws:iam::123456789012:user/alice";
        assert_eq!(account_id_from_arn(arn).as_deref(), Some("123456789012"));
    }

    #[test]
    fn returns_none_for_arn_missing_segments() {
        assert_eq!(account_id_from_arn("not-an-arn"), None);
    }
}
