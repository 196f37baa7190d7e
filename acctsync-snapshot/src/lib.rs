//! Loads and dumps the account entity model to a directory of YAML files.

mod error;
mod path;
mod store;
mod version;

pub use error::SnapshotError;
pub use path::{iam_path, s3_path, IamKind};
pub use store::{dump, load};
pub use version::{check_version, VERSION_FILE_NAME};
