//! Deterministic on-disk path scheme.
//!
//! Grounded on `original_source/iamy/yaml.go`'s `pathRegex` and the four
//! `{{.Account}}/iam/<kind><Path><Name>.yaml` templates — the Go
//! `text/template` indirection is dropped in favour of plain `format!`
//! since the shape is fixed, not user-configurable.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IamKind {
    User,
    Group,
    Role,
    Policy,
    InstanceProfile,
}

impl IamKind {
    fn as_str(self) -> &'static str {
        match self {
            IamKind::User => "user",
            IamKind::Group => "group",
            IamKind::Role => "role",
            IamKind::Policy => "policy",
            IamKind::InstanceProfile => "instance-profile",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(IamKind::User),
            "group" => Some(IamKind::Group),
            "role" => Some(IamKind::Role),
            "policy" => Some(IamKind::Policy),
            "instance-profile" => Some(IamKind::InstanceProfile),
            _ => None,
        }
    }
}

pub enum ParsedPath {
    Iam {
        account_label: String,
        kind: IamKind,
        resource_path: String,
        name: String,
    },
    S3 {
        account_label: String,
        bucket_name: String,
    },
}

fn path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<account>[^/]+)/(?:iam/(?P<kind>user|group|role|policy|instance-profile)(?P<path>/(?:.*/)?)(?P<name>[^/]+)|s3/(?P<bucket>[^/]+))\.yaml$",
        )
        .expect("static regex")
    })
}

/// Parses a file path (relative to the snapshot root) into its
/// account/kind/path/name components. Returns `None` for paths that do
/// not match the scheme; callers skip these with a log note rather than
/// treating them as an error (spec: "files that do not match the regex
/// are skipped with a note").
pub fn parse(relative_path: &str) -> Option<ParsedPath> {
    let normalised = relative_path.replace('\\', "/");
    let captures = path_regex().captures(&normalised)?;

    let account_label = captures.name("account")?.as_str().to_string();

    if let Some(bucket) = captures.name("bucket") {
        return Some(ParsedPath::S3 {
            account_label,
            bucket_name: bucket.as_str().to_string(),
        });
    }

    let kind = IamKind::from_str(captures.name("kind")?.as_str())?;
    let resource_path = captures.name("path")?.as_str().to_string();
    let name = captures.name("name")?.as_str().to_string();

    Some(ParsedPath::Iam {
        account_label,
        kind,
        resource_path,
        name,
    })
}

/// Builds the relative file path for an IAM resource. `resource_path`
/// must carry IAM's leading-and-trailing-slash convention (`/` or
/// `/foo/bar/`).
pub fn iam_path(account_label: &str, kind: IamKind, resource_path: &str, name: &str) -> String {
    format!(
        "{account_label}/iam/{kind}{resource_path}{name}.yaml",
        kind = kind.as_str()
    )
}

pub fn s3_path(account_label: &str, bucket_name: &str) -> String {
    format!("{account_label}/s3/{bucket_name}.yaml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_root_path_iam_resource() {
        match parse("123456789012/iam/user/alice.yaml").unwrap() {
            ParsedPath::Iam {
                account_label,
                kind,
                resource_path,
                name,
            } => {
                assert_eq!(account_label, "123456789012");
                assert_eq!(kind, IamKind::User);
                assert_eq!(resource_path, "/");
                assert_eq!(name, "alice");
            }
            ParsedPath::S3 { .. } => panic!("expected iam variant"),
        }
    }

    #[test]
    fn parses_nested_path_iam_resource() {
        match parse("prod-123456789012/iam/role/eng/deploy-bot.yaml").unwrap() {
            ParsedPath::Iam {
                account_label,
                kind,
                resource_path,
                name,
            } => {
                assert_eq!(account_label, "prod-123456789012");
                assert_eq!(kind, IamKind::Role);
                assert_eq!(resource_path, "/eng/");
                assert_eq!(name, "deploy-bot");
            }
            ParsedPath::S3 { .. } => panic!("expected iam variant"),
        }
    }

    #[test]
    fn parses_s3_bucket_policy() {
        match parse("123456789012/s3/my-bucket.yaml").unwrap() {
            ParsedPath::S3 {
                account_label,
                bucket_name,
            } => {
                assert_eq!(account_label, "123456789012");
                assert_eq!(bucket_name, "my-bucket");
            }
            ParsedPath::Iam { .. } => panic!("expected s3 variant"),
        }
    }

    #[test]
    fn rejects_unrecognised_paths() {
        assert!(parse("123456789012/iam/widget/x.yaml").is_none());
        assert!(parse("README.md").is_none());
        assert!(parse(".iamy-version").is_none());
    }

    #[test]
    fn iam_path_round_trips_through_parse() {
        let built = iam_path("123456789012", IamKind::Policy, "/team/", "deploy");
        match parse(&built).unwrap() {
            ParsedPath::Iam {
                kind,
                resource_path,
                name,
                ..
            } => {
                assert_eq!(kind, IamKind::Policy);
                assert_eq!(resource_path, "/team/");
                assert_eq!(name, "deploy");
            }
            ParsedPath::S3 { .. } => panic!("expected iam variant"),
        }
    }

    #[test]
    fn s3_path_round_trips_through_parse() {
        let built = s3_path("123456789012", "my-bucket");
        match parse(&built).unwrap() {
            ParsedPath::S3 { bucket_name, .. } => assert_eq!(bucket_name, "my-bucket"),
            ParsedPath::Iam { .. } => panic!("expected s3 variant"),
        }
    }
}
