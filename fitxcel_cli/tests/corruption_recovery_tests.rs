//! Corruption recovery tests for the fitxcel binary.
//!
//! These tests verify the system can handle:
//! - Corrupted profile documents
//! - Legacy documents missing task records
//! - Stray temp files from interrupted writes

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fitxcel"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(dir.join("data"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn profiles_dir(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("data/profiles");
    fs::create_dir_all(&path).unwrap();
    path
}

#[test]
fn test_corrupted_profile_is_not_overwritten() {
    let temp_dir = setup_test_dir();
    let doc = profiles_dir(temp_dir.path()).join("local.json");
    fs::write(&doc, "{ invalid json }}}}").expect("Failed to write corrupted profile");

    cli(temp_dir.path())
        .arg("complete")
        .arg("1")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Corrupt profile document"));

    // Earned progress may be hand-recoverable, so the file is left alone
    assert_eq!(fs::read_to_string(&doc).unwrap(), "{ invalid json }}}}");
}

#[test]
fn test_profile_with_empty_tasks_is_repaired() {
    let temp_dir = setup_test_dir();
    let doc = profiles_dir(temp_dir.path()).join("local.json");
    fs::write(
        &doc,
        r#"{"user_id":"local","experience":70,"level":2,"level_points":1,
            "stats":{"strength":12,"stamina":10,"agility":10},"tasks":[],
            "created_at":"2024-05-01T08:00:00Z","updated_at":"2024-05-01T08:00:00Z"}"#,
    )
    .unwrap();

    cli(temp_dir.path())
        .arg("complete")
        .arg("3")
        .assert()
        .success();

    let stored: Value = serde_json::from_str(&fs::read_to_string(&doc).unwrap()).unwrap();
    assert_eq!(stored["tasks"].as_array().unwrap().len(), 3);
    assert_eq!(stored["tasks"][2]["done"], true);
    assert_eq!(stored["experience"], 100);
    assert_eq!(stored["stats"]["strength"], 12);
    // Repair write and completion write
    assert_eq!(stored["version"], 2);
}

#[test]
fn test_stray_temp_files_are_ignored() {
    let temp_dir = setup_test_dir();
    let profiles = profiles_dir(temp_dir.path());
    fs::write(profiles.join(".tmpAbC123"), "{\"user_id\":\"local\"").unwrap();

    cli(temp_dir.path())
        .arg("grant")
        .arg("40")
        .assert()
        .success()
        .stdout(predicate::str::contains("Level 1  (40 / 100 XP, 60 to next)"));
}
