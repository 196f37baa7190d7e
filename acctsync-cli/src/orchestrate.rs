//! Pull/push orchestration (C7): wires the cloud fetcher, the snapshot
//! store and the planner together behind the CLI.

use std::io::Write as _;
use std::path::Path;

use colored::Colorize;

use acctsync_cloud::{FetchOptions, Fetcher, CLOUDFORMATION_STACK_TAG};

use crate::credentials::IamCredentialLookup;

pub const EXIT_USAGE: i32 = 1;
pub const EXIT_RUNTIME: i32 = 2;

pub async fn pull(
    dir: &Path,
    dry_run: bool,
    delete: bool,
    accurate_cfn: bool,
    skip_cfn_tagged: bool,
    mut skip_tagged: Vec<String>,
) -> anyhow::Result<()> {
    if skip_cfn_tagged {
        skip_tagged.push(CLOUDFORMATION_STACK_TAG.to_string());
    }

    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    let fetcher = Fetcher::new(config);

    let opts = FetchOptions {
        skip_descriptions: false,
        accurate_cfn,
        skip_tag_keys: skip_tagged,
    };

    log::info!("fetching live account state");
    let data = fetcher.fetch(&opts).await?;
    log::info!(
        "fetched {} users, {} groups, {} roles, {} policies, {} instance profiles, {} bucket policies for account {}",
        data.users.len(),
        data.groups.len(),
        data.roles.len(),
        data.policies.len(),
        data.instance_profiles.len(),
        data.bucket_policies.len(),
        data.account,
    );

    if dry_run {
        println!("would write account {} to {}", data.account, dir.display());
        return Ok(());
    }

    acctsync_snapshot::dump(dir, std::slice::from_ref(&data), delete)?;
    println!("wrote account {} to {}", data.account, dir.display());
    Ok(())
}

pub async fn push(dir: &Path, dry_run: bool, assume_yes: bool) -> anyhow::Result<()> {
    let running_version = env!("CARGO_PKG_VERSION");
    let accounts = acctsync_snapshot::load(dir, running_version)?;

    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .load()
        .await;
    let fetcher = Fetcher::new(config.clone());

    let live_account_id = fetcher.account_id().await?;
    let desired = accounts
        .iter()
        .find(|a| a.account.id() == live_account_id)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no snapshot for account {} found under {}",
                live_account_id,
                dir.display()
            )
        })?;

    log::info!("fetching live state for account {}", desired.account);
    let live = fetcher
        .fetch(&FetchOptions {
            skip_descriptions: true,
            ..FetchOptions::default()
        })
        .await?;

    let credentials = IamCredentialLookup::new(aws_sdk_iam::Client::new(&config));
    let cmds = acctsync_plan::plan(&live, desired, &credentials).await?;

    if cmds.is_empty() {
        println!("account {} already matches {}", desired.account, dir.display());
        return Ok(());
    }

    print_plan(&cmds);

    if dry_run {
        return Ok(());
    }

    if !assume_yes && !confirm(&cmds)? {
        println!("aborted, no commands executed");
        return Ok(());
    }

    execute(&cmds).await
}

fn print_plan(cmds: &acctsync_plan::CmdList) {
    println!(
        "{} commands planned ({} destructive)",
        cmds.len(),
        cmds.destructive_count()
    );
    for cmd in cmds.iter() {
        if cmd.is_destructive() {
            println!("{}", cmd.to_string().red());
        } else {
            println!("{}", cmd.to_string().green());
        }
    }
}

fn confirm(cmds: &acctsync_plan::CmdList) -> anyhow::Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        log::warn!("stdin is not a tty, refusing to execute {} commands without --yes", cmds.len());
        return Ok(false);
    }

    print!("execute these commands? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn execute(cmds: &acctsync_plan::CmdList) -> anyhow::Result<()> {
    for cmd in cmds.iter() {
        log::info!("executing: {cmd}");
        let status = std::process::Command::new(&cmd.program)
            .args(&cmd.args)
            .status()
            .map_err(|e| anyhow::anyhow!("failed to spawn {}: {e}", cmd.program))?;

        if !status.success() {
            anyhow::bail!("command failed ({status}): {cmd}");
        }
    }
    Ok(())
}
