//! Policy document canonicalization and the canonical account entity model.
//!
//! This crate has no knowledge of the cloud provider SDKs or the YAML
//! snapshot format; it defines the shapes both sides are translated into
//! before the planner compares them.

mod account;
mod codec;
mod json;
mod model;

pub use account::{Account, AccountError};
pub use codec::{parse_plain_json, parse_url_encoded_json, PolicyCodecError, PolicyDocument};
pub use json::{canonicalize, JsonValue};
pub use model::{
    normalize_policy_arn, policy_arn_from_ref, AccountData, BucketPolicy, Group, InlinePolicy,
    InstanceProfile, ManagedPolicy, PolicyVersionMetadata, Role, User, IAM_PARTITION,
};
