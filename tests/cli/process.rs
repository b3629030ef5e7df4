//! Tests that run the compiled binary
//!
//! None of these need a broker: they cover the paths that end before a
//! connection is established, or fail while establishing it.

use std::io::Write;
use std::process::{Command, Output, Stdio};
use tempfile::NamedTempFile;

/// Run pipecat with an empty config file so the user's own config is ignored
fn run(args: &[&str], stdin: &[u8]) -> Output {
    let config = NamedTempFile::new().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_pipecat"))
        .arg("--config-file")
        .arg(config.path())
        .args(args)
        .env_remove("AMQP_URI")
        .env_remove("AMQP_EXCHANGE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    if let Some(mut input) = child.stdin.take() {
        let _ = input.write_all(stdin);
    }
    child.wait_with_output().unwrap()
}

#[test]
fn test_missing_queue_prints_usage_and_fails() {
    for command in ["publish", "consume"] {
        let output = run(&[command], b"");

        assert_eq!(output.status.code(), Some(1), "{}", command);
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(
            stdout.contains("Please provide name of the queue"),
            "stdout: {}",
            stdout
        );
    }
}

#[test]
fn test_unreachable_broker_fails_without_output() {
    let output = run(
        &["publish", "jobs", "--amqpuri", "amqp://127.0.0.1:1/"],
        b"never sent\n",
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
}

#[test]
fn test_help_lists_subcommands() {
    let output = run(&["--help"], b"");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("publish"));
    assert!(stdout.contains("consume"));
}

#[test]
fn test_version_flag() {
    let output = run(&["--version"], b"");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_invalid_timeout_rejected_by_parser() {
    let output = run(&["consume", "jobs", "--timeout", "0"], b"");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn test_invalid_config_file_fails() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "timeout = 0").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_pipecat"))
        .arg("--config-file")
        .arg(config.path())
        .args(["consume", "jobs"])
        .stdin(Stdio::null())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("timeout"), "stderr: {}", stderr);
}
