//! CLI integration tests

use std::process::{Command, Output};

fn styx(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "styx-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = styx(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Styx resource labeller"), "Should show app name");
    assert!(stdout.contains("types"), "Should show types command");
    assert!(stdout.contains("resolve"), "Should show resolve command");
    assert!(stdout.contains("index"), "Should show index command");
    assert!(stdout.contains("label"), "Should show label command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = styx(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("styx"), "Should show binary name");
}

/// Test resolve subcommand help
#[test]
fn test_resolve_help() {
    let output = styx(&["resolve", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Resolve help should succeed");
    assert!(stdout.contains("<TARGET>"), "Should show target argument");
    assert!(stdout.contains("--ip"), "Should show ip option");
}

/// Test label subcommand help
#[test]
fn test_label_help() {
    let output = styx(&["label", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Label help should succeed");
    assert!(stdout.contains("--set"), "Should show set option");
    assert!(stdout.contains("--dry-run"), "Should show dry-run option");
}

/// Test that label requires at least one label
#[test]
fn test_label_requires_set() {
    let output = styx(&["label", "billing-prod"]);
    assert!(!output.status.success(), "Label without --set should fail");
}

/// Test that malformed labels are rejected before connecting
#[test]
fn test_label_rejects_malformed_set() {
    let output = styx(&["label", "billing-prod", "--set", "novalue"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Malformed label should fail");
    assert!(stderr.contains("key=value"), "Should explain the expected form");
}

/// Test types runs without a cluster
#[test]
fn test_types_json() {
    let output = styx(&["types", "--format", "json"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Types should succeed offline");
    assert!(stdout.contains("databaseinstances"), "Should list SQL instances");
    assert!(stdout.contains("compute.gcp.upbound.io"), "Should list compute group");
}
