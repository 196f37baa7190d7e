#[derive(thiserror::Error, Debug)]
pub enum CloudError {
    #[error("IAM request failed: {0}")]
    Iam(String),

    #[error("STS request failed: {0}")]
    Sts(String),

    #[error("S3 request failed: {0}")]
    S3(String),

    #[error("CloudFormation request failed: {0}")]
    Cfn(String),

    #[error("EC2 request failed: {0}")]
    Ec2(String),

    #[error("could not determine the account id: {0}")]
    AccountIdUnresolved(String),

    #[error("response was missing required field '{0}'")]
    MissingField(&'static str),

    #[error(transparent)]
    PolicyCodec(#[from] acctsync_policy::PolicyCodecError),

    #[error(transparent)]
    Account(#[from] acctsync_policy::AccountError),
}

/// Pulls a value out of an `Option` field on an SDK response, turning the
/// provider's "this is technically optional" modeling into a typed error
/// instead of a panic.
pub fn required<T>(value: Option<T>, field: &'static str) -> Result<T, CloudError> {
    value.ok_or(CloudError::MissingField(field))
}
