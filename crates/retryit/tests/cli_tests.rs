//! Integration tests for the retryit binary
//!
//! Each test runs the compiled binary against small shell commands and checks
//! the exit code and how many times the command ran.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const ENV_VARS: [&str; 6] = [
    "RETRYIT_CONFIG",
    "RETRYIT_MAX_ATTEMPTS",
    "RETRYIT_INITIAL_DELAY_MS",
    "RETRYIT_MAX_DELAY_MS",
    "RETRYIT_BACKOFF_FACTOR",
    "RETRYIT_JITTER",
];

fn retryit() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_retryit"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Shell snippet that appends a line to `counter` on every run
fn counting_script(counter: &Path, exit_code: i32) -> String {
    format!("echo run >> {}; exit {}", counter.display(), exit_code)
}

fn runs(counter: &Path) -> usize {
    fs::read_to_string(counter)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run retryit")
}

#[test]
fn test_success_runs_once() {
    let temp = TempDir::new().unwrap();
    let counter = temp.path().join("runs");

    let output = run(retryit()
        .args(["-n", "4", "--initial-delay-ms", "1", "--", "sh", "-c"])
        .arg(counting_script(&counter, 0)));

    assert!(output.status.success());
    assert_eq!(runs(&counter), 1);
}

#[test]
fn test_failure_exhausts_attempts_and_keeps_exit_code() {
    let temp = TempDir::new().unwrap();
    let counter = temp.path().join("runs");

    let output = run(retryit()
        .args(["-n", "3", "--initial-delay-ms", "1", "--jitter", "0", "--", "sh", "-c"])
        .arg(counting_script(&counter, 7)));

    assert_eq!(output.status.code(), Some(7));
    assert_eq!(runs(&counter), 3);
}

#[test]
fn test_succeeds_on_third_run() {
    let temp = TempDir::new().unwrap();
    let counter = temp.path().join("runs");
    let script = format!(
        "echo run >> {0}; test $(wc -l < {0}) -ge 3",
        counter.display()
    );

    let output = run(retryit()
        .args(["-n", "5", "--initial-delay-ms", "1", "--", "sh", "-c"])
        .arg(script));

    assert!(output.status.success());
    assert_eq!(runs(&counter), 3);
}

#[test]
fn test_zero_attempts_never_runs() {
    let temp = TempDir::new().unwrap();
    let counter = temp.path().join("runs");

    let output = run(retryit()
        .args(["-n", "0", "--", "sh", "-c"])
        .arg(counting_script(&counter, 0)));

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(runs(&counter), 0);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no attempts made"));
}

#[test]
fn test_timeout_stops_retrying() {
    let temp = TempDir::new().unwrap();
    let counter = temp.path().join("runs");

    let output = run(retryit()
        .args([
            "-n",
            "100",
            "--initial-delay-ms",
            "400",
            "--backoff-factor",
            "1",
            "--jitter",
            "0",
            "--timeout-secs",
            "1",
            "--",
            "sh",
            "-c",
        ])
        .arg(counting_script(&counter, 1)));

    assert_eq!(output.status.code(), Some(124));
    let count = runs(&counter);
    assert!(count >= 1 && count < 100, "ran {} times", count);
}

#[test]
fn test_config_file_and_env_layers() {
    let temp = TempDir::new().unwrap();
    let counter = temp.path().join("runs");
    let config = temp.path().join("retry.yaml");
    fs::write(&config, "max-attempts: 6\ninitial-delay-ms: 1\njitter: 0\n").unwrap();

    // Environment overrides the file
    let output = run(retryit()
        .env("RETRYIT_MAX_ATTEMPTS", "2")
        .arg("--config")
        .arg(&config)
        .args(["--", "sh", "-c"])
        .arg(counting_script(&counter, 1)));

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(runs(&counter), 2);

    // Flags override the environment
    fs::remove_file(&counter).unwrap();
    let output = run(retryit()
        .env("RETRYIT_MAX_ATTEMPTS", "2")
        .arg("--config")
        .arg(&config)
        .args(["-n", "4", "--", "sh", "-c"])
        .arg(counting_script(&counter, 1)));

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(runs(&counter), 4);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let output = run(retryit().args(["--config", "/nonexistent/retry.yaml", "true"]));

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Configuration file not found"));
}
