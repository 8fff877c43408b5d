use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// A command isolated from the user's config, data and backends
fn medassist(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("medassist").unwrap();
    cmd.env("MEDASSIST_CLI_CONFIG", home.join("config.toml"))
        .env("MEDASSIST_DATA_DIR", home.join("data"))
        .env("MEDASSIST_PROCESSING_URL", "http://127.0.0.1:9")
        .env_remove("MEDASSIST_STORE_URL")
        .env_remove("RUST_LOG")
        .arg("--no-color")
        .arg("--local-store")
        .arg(home.join("store"));
    cmd
}

#[test]
fn test_first_run_lists_default_workspace() {
    let home = TempDir::new().unwrap();

    medassist(home.path())
        .args(["workspace", "list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"My Workspace\""));
}

#[test]
fn test_create_and_switch_workspaces() {
    let home = TempDir::new().unwrap();

    medassist(home.path())
        .args(["workspace", "create", "Alpha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created workspace Alpha"));

    medassist(home.path())
        .args(["workspace", "create", "alpha"])
        .assert()
        .failure();

    medassist(home.path())
        .args(["workspace", "use", "My Workspace"])
        .assert()
        .success();

    medassist(home.path())
        .args(["workspace", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alpha"))
        .stdout(predicate::str::contains("My Workspace"));
}

#[test]
fn test_last_workspace_cannot_be_deleted() {
    let home = TempDir::new().unwrap();

    medassist(home.path())
        .args(["workspace", "delete", "My Workspace", "--force"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one workspace"));
}

#[test]
fn test_upload_without_processing_is_partial_failure() {
    let home = TempDir::new().unwrap();
    let report = home.path().join("report.pdf");
    std::fs::write(&report, b"%PDF-1.4 test").unwrap();

    medassist(home.path())
        .args(["docs", "upload", "medical"])
        .arg(&report)
        .assert()
        .failure()
        .stdout(predicate::str::contains("medassist docs retry medical"))
        .stderr(predicate::str::contains("saved but could not be processed"));

    medassist(home.path())
        .args(["docs", "list", "medical", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("report.pdf"));
}

#[test]
fn test_upload_of_unsupported_files_makes_no_calls() {
    let home = TempDir::new().unwrap();
    let notes = home.path().join("notes.exe");
    std::fs::write(&notes, b"MZ").unwrap();

    medassist(home.path())
        .args(["docs", "upload", "patient"])
        .arg(&notes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("None of the selected files are supported"));

    assert!(!home.path().join("store").exists());
}

#[test]
fn test_config_set_get_and_reset() {
    let home = TempDir::new().unwrap();

    medassist(home.path())
        .args(["config", "set", "store_url", "http://store.local:3000"])
        .assert()
        .success();

    medassist(home.path())
        .args(["config", "get", "store_url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("http://store.local:3000"));

    medassist(home.path())
        .args(["config", "set", "api_key", "secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));

    medassist(home.path())
        .args(["config", "reset", "--force"])
        .assert()
        .success();

    assert!(!home.path().join("config.toml").exists());
}

#[test]
fn test_history_starts_empty() {
    let home = TempDir::new().unwrap();

    medassist(home.path())
        .args(["history", "list", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No chat threads found."));
}
