//! Command-line surface (C7).
//!
//! Grounded on the `clap` derive conventions used throughout the donor
//! workspace's binaries (`derive(Parser)`/`derive(Subcommand)`, `env`
//! fallbacks on shared flags).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "acctsync",
    about = "Mirrors IAM and S3 bucket policies between a directory of YAML files and a live AWS account",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug-level logging.
    #[arg(long, global = true)]
    pub debug: bool,

    /// The directory holding the account snapshot.
    #[arg(long, global = true, default_value = ".", env = "ACCTSYNC_DIR")]
    pub dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch live account state and write it to the snapshot directory.
    Pull {
        /// Print what would be written without touching the filesystem.
        #[arg(long)]
        dry_run: bool,

        /// Remove this account's existing snapshot subtree before writing.
        #[arg(long)]
        delete: bool,

        /// Build a precise CloudFormation-managed-resource inventory
        /// instead of relying on the name-heuristic filter alone.
        #[arg(long)]
        accurate_cfn: bool,

        /// Shorthand for `--skip-tagged aws:cloudformation:stack-name`.
        #[arg(long)]
        skip_cfn_tagged: bool,

        /// Skip any user carrying this tag key. Repeatable.
        #[arg(long = "skip-tagged", value_name = "TAG")]
        skip_tagged: Vec<String>,
    },

    /// Compute and (after confirmation) execute the plan that reconciles
    /// live account state with the snapshot directory.
    Push {
        /// Print the plan without prompting for execution.
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt and execute immediately.
        #[arg(long, short = 'y')]
        yes: bool,
    },
}
