//! End-to-end tests of the `analyze-transcript` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

mod common;
use common::{assistant_line, create_transcript, user_line, SONNET};

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("analyze-transcript").unwrap();
    cmd.env("LOG_LEVEL", "error")
        .env_remove("RUST_LOG")
        .env_remove("TRANSCRIPT_PRICING_FILE")
        .env_remove("TRANSCRIPT_INVALIDATION_THRESHOLD")
        .env_remove("TRANSCRIPT_GROWTH_THRESHOLD");
    cmd
}

#[test]
fn test_missing_argument_prints_usage() {
    cli()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_missing_file_fails_without_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.jsonl");

    cli()
        .arg(&path)
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("File not found"))
        .stdout(predicate::str::contains("SUMMARY").not());
}

#[test]
fn test_two_line_transcript_events() {
    let (_dir, path) = create_transcript(&[
        assistant_line(SONNET, 10, 20, 0, 500),
        user_line(),
        assistant_line(SONNET, 10, 20, 500, 0),
    ]);

    cli()
        .arg(&path)
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("🆕 CACHE START"))
        .stdout(predicate::str::contains("⚡ CACHE READ"))
        .stdout(predicate::str::contains("Total Messages: 2"))
        .stdout(predicate::str::contains("PER-MODEL BREAKDOWN & COSTS:"))
        .stdout(predicate::str::contains("Cost without cache:"));
}

#[test]
fn test_no_savings_section_without_cache_reads() {
    let (_dir, path) = create_transcript(&[assistant_line(SONNET, 1_000_000, 0, 0, 0)]);

    cli()
        .arg(&path)
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("  Cost:     $3.0000"))
        .stdout(predicate::str::contains("Cost without cache").not())
        .stdout(predicate::str::contains("Cache Efficiency").not());
}

#[test]
fn test_threshold_flag_changes_classification() {
    let (_dir, path) = create_transcript(&[
        assistant_line(SONNET, 10, 10, 20_000, 0),
        assistant_line(SONNET, 10, 10, 18_000, 0),
    ]);

    cli()
        .arg(&path)
        .args(["--no-color", "--invalidation-threshold", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("🔄 INVALIDATION (↓2.0k)"));
}

#[test]
fn test_json_output() {
    let (_dir, path) = create_transcript(&[
        assistant_line(SONNET, 10, 20, 0, 500),
        assistant_line(SONNET, 10, 20, 500, 0),
    ]);

    let output = cli().arg(&path).arg("--json").output().unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["messages"], 2);
    assert_eq!(value["records"][0]["event"]["kind"], "cache_start");
    assert_eq!(value["records"][1]["event"]["kind"], "first_read");
}

#[test]
fn test_json_error_for_missing_file() {
    let dir = tempfile::tempdir().unwrap();

    let output = cli()
        .arg(dir.path().join("missing.jsonl"))
        .arg("--json")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(value["error"].as_str().unwrap().contains("File not found"));
}

#[test]
fn test_custom_pricing_file() {
    let (dir, path) = create_transcript(&[assistant_line("house-model", 2_000_000, 0, 0, 0)]);
    let pricing = dir.path().join("prices.toml");
    fs::write(
        &pricing,
        "[models.\"house-model\"]\ninput = 1.5\ncache_write = 2.0\ncache_read = 0.2\noutput = 6.0\n",
    )
    .unwrap();

    cli()
        .arg(&path)
        .arg("--no-color")
        .arg("--pricing")
        .arg(&pricing)
        .assert()
        .success()
        .stdout(predicate::str::contains("  Cost:     $3.0000"));
}

#[test]
fn test_cli_threshold_overrides_invalid_config_file() {
    let (dir, path) = create_transcript(&[
        assistant_line(SONNET, 10, 10, 20_000, 0),
        assistant_line(SONNET, 10, 10, 19_000, 0),
    ]);
    fs::write(
        dir.path().join("transcript-analyzer.toml"),
        "[analysis]\ninvalidation_threshold = 0\n",
    )
    .unwrap();

    cli()
        .current_dir(dir.path())
        .arg(&path)
        .args(["--no-color", "--invalidation-threshold", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("🔄 INVALIDATION (↓1.0k)"));

    cli()
        .current_dir(dir.path())
        .arg(&path)
        .arg("--no-color")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalidation threshold must be greater than 0"));
}
