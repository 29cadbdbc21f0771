//! End-to-end checks of the compiled binary: argument handling, exit
//! codes, and the offline behavior of `health`.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled `bucketwatch` binary next to the test
/// executable.
fn bucketwatch_bin() -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current executable path")
        .parent()
        .expect("No parent")
        .to_path_buf();

    if path.ends_with("deps") {
        path = path.parent().expect("No parent").to_path_buf();
    }

    path.join("bucketwatch")
}

#[test]
fn test_cli_help_lists_subcommands() {
    let output = Command::new(bucketwatch_bin())
        .arg("--help")
        .output()
        .expect("Failed to run bucketwatch --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("health"));
}

#[test]
fn test_cli_version() {
    let output = Command::new(bucketwatch_bin())
        .arg("--version")
        .output()
        .expect("Failed to run bucketwatch --version");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("bucketwatch"));
}

#[test]
fn test_unknown_subcommand_fails() {
    let output = Command::new(bucketwatch_bin())
        .arg("frobnicate")
        .output()
        .expect("Failed to run bucketwatch");

    assert!(!output.status.success());
}

#[test]
fn test_health_with_unreachable_endpoint_exits_nonzero() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    fs::write(
        dir.path().join("s3_config.json"),
        r#"{
  "S3_ENDPOINT_URL": "http://127.0.0.1:1",
  "S3_ACCESS_KEY": "ak",
  "S3_SECRET_KEY": "sk",
  "S3_REGION": "us-east-1"
}"#,
    )
    .expect("Failed to write settings");

    let output = Command::new(bucketwatch_bin())
        .args(["health", "--config-dir"])
        .arg(dir.path())
        .arg("--quiet")
        .output()
        .expect("Failed to run bucketwatch health");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Endpoint: http://127.0.0.1:1"));
    assert!(stdout.contains("Connection Failed"));
}

#[test]
fn test_serve_rejects_invalid_poll_interval() {
    let output = Command::new(bucketwatch_bin())
        .args(["serve", "--poll-interval", "0", "--quiet"])
        .output()
        .expect("Failed to run bucketwatch serve");

    assert_eq!(output.status.code(), Some(1));
}
