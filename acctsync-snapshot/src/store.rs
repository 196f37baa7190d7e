//! Recursive load/dump of the entity model to a directory of YAML files.
//!
//! Grounded on `original_source/iamy/yaml.go`'s `YamlLoadDumper`
//! (`Load`, `Dump`, `getFilesRecursively`) — `gopkg.in/yaml.v2` is
//! replaced with `serde_yaml`, matching the teacher's `serde`-everywhere
//! convention, and the goroutine-free directory walk becomes a single
//! `walkdir::WalkDir` pass.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use acctsync_policy::{Account, AccountData, BucketPolicy, Group, InstanceProfile, ManagedPolicy, Role, User};
use walkdir::WalkDir;

use crate::error::SnapshotError;
use crate::path::{self, IamKind, ParsedPath};
use crate::version::{self, VERSION_FILE_NAME};

/// Loads every `AccountData` found under `dir`. `running_version` is
/// checked against an optional `.iamy-version` file at the root.
pub fn load(dir: &Path, running_version: &str) -> Result<Vec<AccountData>, SnapshotError> {
    check_version_file(dir, running_version)?;

    log::info!("loading YAML account data from {}", dir.display());
    let mut accounts: HashMap<String, AccountData> = HashMap::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| SnapshotError::Io {
            path: dir.display().to_string(),
            source: e.into(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .to_string();

        if relative == VERSION_FILE_NAME {
            continue;
        }

        let Some(parsed) = path::parse(&relative) else {
            log::debug!("skipping {relative}, does not match the snapshot path scheme");
            continue;
        };

        let body = fs::read_to_string(entry.path()).map_err(|e| SnapshotError::Io {
            path: entry.path().display().to_string(),
            source: e,
        })?;

        load_one(&mut accounts, &relative, parsed, &body)?;
    }

    Ok(accounts.into_values().collect())
}

fn load_one(
    accounts: &mut HashMap<String, AccountData>,
    relative_path: &str,
    parsed: ParsedPath,
    body: &str,
) -> Result<(), SnapshotError> {
    let yaml_err = |source: serde_yaml::Error| SnapshotError::Yaml {
        path: relative_path.to_string(),
        source,
    };

    match parsed {
        ParsedPath::Iam {
            account_label,
            kind,
            resource_path,
            name,
        } => {
            let data = account_entry(accounts, &account_label)?;
            match kind {
                IamKind::User => {
                    let mut user: User = serde_yaml::from_str(body).map_err(yaml_err)?;
                    user.name = name;
                    user.path = resource_path;
                    data.users.push(user);
                }
                IamKind::Group => {
                    let mut group: Group = serde_yaml::from_str(body).map_err(yaml_err)?;
                    group.name = name;
                    group.path = resource_path;
                    data.groups.push(group);
                }
                IamKind::Role => {
                    let mut role: Role = serde_yaml::from_str(body).map_err(yaml_err)?;
                    role.name = name;
                    role.path = resource_path;
                    data.roles.push(role);
                }
                IamKind::Policy => {
                    let mut policy: ManagedPolicy = serde_yaml::from_str(body).map_err(yaml_err)?;
                    policy.name = name;
                    policy.path = resource_path;
                    data.policies.push(policy);
                }
                IamKind::InstanceProfile => {
                    let mut profile: InstanceProfile =
                        serde_yaml::from_str(body).map_err(yaml_err)?;
                    profile.name = name;
                    profile.path = resource_path;
                    data.instance_profiles.push(profile);
                }
            }
        }
        ParsedPath::S3 {
            account_label,
            bucket_name,
        } => {
            let data = account_entry(accounts, &account_label)?;
            let mut bucket_policy: BucketPolicy = serde_yaml::from_str(body).map_err(yaml_err)?;
            bucket_policy.bucket_name = bucket_name;
            data.bucket_policies.push(bucket_policy);
        }
    }

    Ok(())
}

fn account_entry<'a>(
    accounts: &'a mut HashMap<String, AccountData>,
    label: &str,
) -> Result<&'a mut AccountData, SnapshotError> {
    if !accounts.contains_key(label) {
        let account = Account::parse(label).map_err(|source| SnapshotError::Account {
            label: label.to_string(),
            source,
        })?;
        accounts.insert(label.to_string(), AccountData::new(account));
    }
    Ok(accounts.get_mut(label).expect("just inserted"))
}

fn check_version_file(dir: &Path, running_version: &str) -> Result<(), SnapshotError> {
    let version_path = dir.join(VERSION_FILE_NAME);
    if !version_path.exists() {
        return Ok(());
    }
    let declared = fs::read_to_string(&version_path).map_err(|e| SnapshotError::Io {
        path: version_path.display().to_string(),
        source: e,
    })?;
    version::check_version(&declared, running_version)
}

/// Writes every account's resources to `dir`. When `delete_extraneous`
/// is set, each account's subtree is wiped before writing so that files
/// for resources no longer present in `accounts` do not linger.
pub fn dump(dir: &Path, accounts: &[AccountData], delete_extraneous: bool) -> Result<(), SnapshotError> {
    log::info!("dumping YAML account data to {}", dir.display());

    for data in accounts {
        let label = data.account.to_string();

        if delete_extraneous {
            let account_dir = dir.join(&label);
            if account_dir.exists() {
                fs::remove_dir_all(&account_dir).map_err(|e| SnapshotError::Io {
                    path: account_dir.display().to_string(),
                    source: e,
                })?;
            }
        }

        for user in &data.users {
            write_yaml(dir, &path::iam_path(&label, IamKind::User, &user.path, &user.name), user)?;
        }
        for policy in &data.policies {
            write_yaml(
                dir,
                &path::iam_path(&label, IamKind::Policy, &policy.path, &policy.name),
                policy,
            )?;
        }
        for group in &data.groups {
            write_yaml(
                dir,
                &path::iam_path(&label, IamKind::Group, &group.path, &group.name),
                group,
            )?;
        }
        for role in &data.roles {
            write_yaml(dir, &path::iam_path(&label, IamKind::Role, &role.path, &role.name), role)?;
        }
        for profile in &data.instance_profiles {
            write_yaml(
                dir,
                &path::iam_path(&label, IamKind::InstanceProfile, &profile.path, &profile.name),
                profile,
            )?;
        }
        for bucket_policy in &data.bucket_policies {
            write_yaml(
                dir,
                &path::s3_path(&label, &bucket_policy.bucket_name),
                bucket_policy,
            )?;
        }
    }

    Ok(())
}

fn write_yaml<T: serde::Serialize>(root: &Path, relative_path: &str, value: &T) -> Result<(), SnapshotError> {
    let full_path = root.join(relative_path);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).map_err(|e| SnapshotError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let body = serde_yaml::to_string(value).map_err(|source| SnapshotError::Yaml {
        path: relative_path.to_string(),
        source,
    })?;

    fs::write(&full_path, body).map_err(|e| SnapshotError::Io {
        path: full_path.display().to_string(),
        source: e,
    })
}
