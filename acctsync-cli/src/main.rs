//! Entry point (C7): wires the CLI surface to the pull/push orchestration
//! and maps results to exit codes.
//!
//! Exit codes mirror the `iam-policy-autopilot` CLI's convention: `0`
//! success, `1` usage error (handled by `clap` before we get here), `2`+
//! runtime failure.

mod cli;
mod credentials;
mod orchestrate;

use clap::Parser;

use cli::{Cli, Command};
use orchestrate::{EXIT_RUNTIME, EXIT_USAGE};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let is_help_or_version = matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp
                    | clap::error::ErrorKind::DisplayVersion
                    | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            );
            std::process::exit(if is_help_or_version { 0 } else { EXIT_USAGE });
        }
    };
    acctsync_common::init_logging(cli.debug);

    let result = match cli.command {
        Command::Pull {
            dry_run,
            delete,
            accurate_cfn,
            skip_cfn_tagged,
            skip_tagged,
        } => orchestrate::pull(&cli.dir, dry_run, delete, accurate_cfn, skip_cfn_tagged, skip_tagged).await,
        Command::Push { dry_run, yes } => orchestrate::push(&cli.dir, dry_run, yes).await,
    };

    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(EXIT_RUNTIME);
    }
}
