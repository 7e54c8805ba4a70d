//! CLI options interaction tests
//!
//! These tests exercise the paths that finish before any probe touches the
//! network: help, default targets and configuration errors.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Run the binary from an empty directory with no configuration in the environment
fn create_test_cmd(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nrp").unwrap();
    cmd.current_dir(workdir.path());
    for var in [
        "TARGETS_FILE",
        "DNS_TIMEOUT_SECONDS",
        "TCP_TIMEOUT_SECONDS",
        "HTTPS_TIMEOUT_SECONDS",
        "QUIC_TIMEOUT_SECONDS",
        "UDP_WAIT_MS",
        "PING_COUNT",
        "NTP_TIMEOUT_SECONDS",
        "SPEEDTEST_ENDPOINT",
        "SPEEDTEST_ROUNDS",
        "CONCURRENCY",
        "SITE_LABEL",
        "ENABLE_COLOR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_options() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: nrp"))
        .stdout(predicate::str::contains("--targets"))
        .stdout(predicate::str::contains("--history-dir"))
        .stdout(predicate::str::contains("--strict"));
}

#[test]
fn test_print_default_targets_is_valid_json() {
    let dir = TempDir::new().unwrap();
    let output = create_test_cmd(&dir).arg("--print-default-targets").output().unwrap();

    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["dns"].as_array().is_some_and(|dns| !dns.is_empty()));
    assert_eq!(value["ntp"], "pool.ntp.org");
}

#[test]
fn test_color_flags_conflict() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--color", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Cannot specify both --color and --no-color"));
}

#[test]
fn test_empty_site_label_rejected() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--site-label", "  "])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--site-label cannot be empty"));
}

#[test]
fn test_ping_count_out_of_range() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--ping-count", "50"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--ping-count"));
}

#[test]
fn test_missing_targets_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--no-color", "--targets", "does-not-exist.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read targets file"))
        .stderr(predicate::str::contains("Configuration help"));
}

#[test]
fn test_malformed_targets_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("targets.json");
    fs::write(&path, r#"{"udp_ranges": [{"host": "media.example", "start_port": 9000, "end_port": 8000}]}"#).unwrap();

    create_test_cmd(&dir)
        .arg("--no-color")
        .arg("--targets")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid targets file"));
}

#[test]
fn test_invalid_env_value_is_config_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .env("UDP_WAIT_MS", "forever")
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("UDP_WAIT_MS"));
}

#[test]
fn test_invalid_env_file_value_is_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "SPEEDTEST_ROUNDS=0\n").unwrap();

    create_test_cmd(&dir)
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Speedtest rounds must be between 1 and 10"));
}

#[test]
fn test_env_help_lists_variables() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--env-help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Supported Environment Variables:"))
        .stdout(predicate::str::contains("SPEEDTEST_ENDPOINT"));
}

#[test]
fn test_write_env_example() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("example.env");

    create_test_cmd(&dir)
        .arg("--write-env-example")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote example configuration"));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("# Network Readiness Probe Configuration"));
    assert!(content.contains("# UDP_WAIT_MS="));
}

#[test]
fn test_concurrency_flags_conflict() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--auto-concurrency", "--concurrency", "4"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
