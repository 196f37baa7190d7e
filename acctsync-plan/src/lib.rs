//! The diff planner (C6): turns a pair of account snapshots into the
//! ordered list of provider CLI commands that reconciles them.

mod cmd;
mod credentials;
mod diff;
mod error;
mod planner;

pub use cmd::{Cmd, CmdList};
pub use credentials::{AccessKeyMetadata, CredentialLookup, MfaDeviceMetadata, NoCredentials};
pub use diff::set_difference;
pub use error::PlanError;
pub use planner::{plan, BUCKET_POLICY_DELETED_SENTINEL, MANAGED_POLICY_VERSION_LIMIT};
