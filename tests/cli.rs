use assert_cmd::prelude::*;
use predicates::str::contains;
use std::process::Command;
use tempfile::TempDir;

#[test]
fn cli_version() {
    Command::cargo_bin("simpool-print")
        .unwrap()
        .args(["-V"])
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn print_runs_every_job() {
    let output = Command::cargo_bin("simpool-print")
        .unwrap()
        .args(["-w", "4", "-q", "8", "-n", "50"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut printed: Vec<usize> = stdout.lines().map(|l| l.parse().unwrap()).collect();
    printed.sort_unstable();
    assert_eq!(printed, (0..50).collect::<Vec<_>>());
}

#[test]
fn print_rejects_zero_workers() {
    Command::cargo_bin("simpool-print")
        .unwrap()
        .args(["-w", "0", "-n", "1"])
        .assert()
        .failure()
        .stderr(contains("worker count must be at least 1"));
}

#[test]
fn copy_reports_both_passes() {
    let temp_dir = TempDir::new().unwrap();
    Command::cargo_bin("simpool-copy")
        .unwrap()
        .args(["--path"])
        .arg(temp_dir.path())
        .args(["-w", "4", "-q", "16", "-n", "200"])
        .assert()
        .success()
        .stdout(contains("copied 200"))
        .stdout(contains("batched 200"))
        .stdout(contains("transferred 200, failed 0"));
}

#[test]
fn client_without_server_fails() {
    Command::cargo_bin("simpool-client")
        .unwrap()
        .args(["echo", "hi", "--addr", "127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(contains("Failed to connect"));
}
