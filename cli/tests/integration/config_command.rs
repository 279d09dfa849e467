//! Integration tests for `agentify config` command.
//!
//! All filesystem-touching tests set `AGENTIFY_CONFIG` to a temp path so they
//! never read or write `~/.agentify/config.yaml`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn agentify() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("agentify"));
    cmd.env("NO_COLOR", "1").env_remove("AGENTIFY_ENV");
    cmd
}

/// Returns a `TempDir` and the path string for a config file inside it.
fn temp_config_path() -> (TempDir, String) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir
        .path()
        .join("config.yaml")
        .to_string_lossy()
        .into_owned();
    (dir, path)
}

// ---------------------------------------------------------------------------
// Subcommand registration
// ---------------------------------------------------------------------------

#[test]
fn test_config_help_shows_show_and_set_subcommands() {
    agentify()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("set"));
}

// ---------------------------------------------------------------------------
// `agentify config show`
// ---------------------------------------------------------------------------

#[test]
fn test_config_show_without_file_lists_defaults() {
    let (_dir, path) = temp_config_path();
    agentify()
        .args(["config", "show"])
        .env("AGENTIFY_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("build.concurrency:"))
        .stdout(predicate::str::contains("output.root:"))
        .stdout(predicate::str::contains("(default)"));
}

#[test]
fn test_config_show_json_has_effective_environment() {
    let (_dir, path) = temp_config_path();
    let out = agentify()
        .args(["config", "show", "--json"])
        .env("AGENTIFY_CONFIG", &path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).expect("JSON");
    assert_eq!(v["config"]["build"]["concurrency"], 2);
    assert!(v["effective"].is_object());
}

#[test]
fn test_config_show_production_env_disables_install() {
    let (_dir, path) = temp_config_path();
    agentify()
        .args(["config", "show"])
        .env("AGENTIFY_CONFIG", &path)
        .env("AGENTIFY_ENV", "production")
        .assert()
        .success()
        .stdout(predicate::str::contains("tool install:").and(predicate::str::contains("disabled")));
}

// ---------------------------------------------------------------------------
// `agentify config set`
// ---------------------------------------------------------------------------

#[test]
fn test_config_set_persists_value() {
    let (_dir, path) = temp_config_path();
    agentify()
        .args(["config", "set", "build.concurrency", "4"])
        .env("AGENTIFY_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Set build.concurrency = 4"));

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("concurrency: 4"), "got: {written}");

    agentify()
        .args(["config", "show"])
        .env("AGENTIFY_CONFIG", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("build concurrency:").and(predicate::str::contains("4")));
}

#[test]
fn test_config_set_unknown_key_fails() {
    let (_dir, path) = temp_config_path();
    agentify()
        .args(["config", "set", "security.level", "strict"])
        .env("AGENTIFY_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown setting"));
    assert!(!std::path::Path::new(&path).exists());
}

#[test]
fn test_config_set_invalid_value_fails() {
    let (_dir, path) = temp_config_path();
    agentify()
        .args(["config", "set", "build.concurrency", "0"])
        .env("AGENTIFY_CONFIG", &path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value for build.concurrency"));
}
