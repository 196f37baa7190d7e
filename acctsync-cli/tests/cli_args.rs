use std::process::Command;

#[test]
fn help_lists_pull_and_push() {
    let out = Command::new(env!("CARGO_BIN_EXE_acctsync"))
        .arg("--help")
        .output()
        .expect("failed to run --help");
    let s = String::from_utf8_lossy(&out.stdout);
    assert!(s.contains("pull"), "help should list pull: {s}");
    assert!(s.contains("push"), "help should list push: {s}");
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn unknown_flag_exits_with_usage_code() {
    let out = Command::new(env!("CARGO_BIN_EXE_acctsync"))
        .args(["pull", "--not-a-real-flag"])
        .output()
        .expect("failed to run pull with a bogus flag");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn missing_subcommand_exits_with_usage_code() {
    let out = Command::new(env!("CARGO_BIN_EXE_acctsync"))
        .output()
        .expect("failed to run with no subcommand");
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn push_against_empty_directory_reports_missing_snapshot_or_fetch_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = Command::new(env!("CARGO_BIN_EXE_acctsync"))
        .args(["--dir", dir.path().to_str().unwrap(), "push", "--dry-run"])
        .output()
        .expect("failed to run push");

    // No credentials and no snapshot in the sandbox: either the load step
    // or the fetch step fails, but the process must report it as a
    // runtime failure rather than panicking.
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.starts_with("error:"), "stderr was: {stderr}");
}
