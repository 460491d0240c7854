//! End-to-end tests for the `quest-rs` binary.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Binary with a clean environment and an empty working directory.
fn quest(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quest-rs").unwrap();
    cmd.env_clear().current_dir(dir.path());
    cmd
}

#[test]
fn test_blank_query_fails_with_validation_message() {
    let dir = tempfile::tempdir().unwrap();
    quest(&dir)
        .args(["ask", "   "])
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid query"));
}

#[test]
fn test_ask_without_keys_reports_missing_slot() {
    let dir = tempfile::tempdir().unwrap();
    quest(&dir)
        .args(["--format", "json", "ask", "What is Rust?"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"status\": \"failure\""))
        .stdout(predicate::str::contains("no API keys available for slot 'model'"));
}

#[test]
fn test_keys_counts_numbered_variables() {
    let dir = tempfile::tempdir().unwrap();
    quest(&dir)
        .env("GEMINI_API_KEY_1", "g-one")
        .env("GEMINI_API_KEY_2", "g-two")
        .env("TAVILY_API_KEY_1", "t-one")
        .arg("keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 key(s) from GEMINI_API_KEY_1"))
        .stdout(predicate::str::contains("1 key(s) from TAVILY_API_KEY_1"))
        .stdout(predicate::str::contains("g-one").not());
}

#[test]
fn test_keys_reads_dotenv_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".env"), "TAVILY_API_KEY_3=t-three\n").unwrap();
    quest(&dir)
        .args(["--format", "json", "keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"keys\": 1"))
        .stdout(predicate::str::contains("\"keys\": 0"));
}

#[test]
fn test_init_prompts_writes_templates() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("prompts");
    quest(&dir)
        .arg("init-prompts")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 4 prompt template(s)"));
    assert!(target.join("planning.md").exists());
    assert!(target.join("controller.md").exists());
}
