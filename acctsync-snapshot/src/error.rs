use acctsync_policy::AccountError;

#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("'{label}' is not a valid account label: {source}")]
    Account {
        label: String,
        #[source]
        source: AccountError,
    },

    #[error("'{found}' in .iamy-version is not a valid semver version: {source}")]
    InvalidVersionFile {
        found: String,
        #[source]
        source: semver::Error,
    },

    #[error("this tool (version {running}) is older than the version required by this directory ({required}); upgrade before continuing")]
    ToolTooOld { running: String, required: String },
}
