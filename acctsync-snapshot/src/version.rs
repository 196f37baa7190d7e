//! `.iamy-version` minimum-tool-version gate (spec.md §6).

use semver::Version;

use crate::error::SnapshotError;

pub const VERSION_FILE_NAME: &str = ".iamy-version";
const DEV_VERSION: &str = "dev";

/// Checks `declared` (the contents of a `.iamy-version` file) against the
/// running tool's version. A literal `dev` string always passes, matching
/// local development builds that have no meaningful semver.
pub fn check_version(declared: &str, running: &str) -> Result<(), SnapshotError> {
    let declared = declared.trim();
    if declared == DEV_VERSION {
        return Ok(());
    }

    let required = Version::parse(declared).map_err(|e| SnapshotError::InvalidVersionFile {
        found: declared.to_string(),
        source: e,
    })?;

    if running == DEV_VERSION {
        return Ok(());
    }

    let running = Version::parse(running).map_err(|e| SnapshotError::InvalidVersionFile {
        found: running.to_string(),
        source: e,
    })?;

    if running < required {
        return Err(SnapshotError::ToolTooOld {
            running: running.to_string(),
            required: required.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_when_running_is_newer_or_equal() {
        check_version("1.2.0", "1.2.0").unwrap();
        check_version("1.2.0", "1.3.0").unwrap();
    }

    #[test]
    fn fails_when_running_is_older() {
        let err = check_version("2.0.0", "1.9.9").unwrap_err();
        assert!(matches!(err, SnapshotError::ToolTooOld { .. }));
    }

    #[test]
    fn dev_declared_version_always_passes() {
        check_version("dev", "0.0.1").unwrap();
    }

    #[test]
    fn dev_running_version_always_passes() {
        check_version("99.0.0", "dev").unwrap();
    }
}
