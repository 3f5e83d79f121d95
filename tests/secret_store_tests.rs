//! CLI-level tests for the local secret store and backend mappings.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn dotveil(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("dotveil").unwrap();
    cmd.arg("--dir").arg(dir);
    cmd
}

#[test]
fn test_secret_set_and_list() {
    let temp_dir = TempDir::new().unwrap();

    dotveil(temp_dir.path())
        .args(["secret", "set", "STRIPE_KEY", "--value", "sk_live_test1234567890"])
        .assert()
        .success()
        .stdout(predicate::str::contains("STRIPE_KEY"));

    dotveil(temp_dir.path())
        .args(["secret", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("STRIPE_KEY"))
        // Values must never appear in listings.
        .stdout(predicate::str::contains("sk_live_test1234567890").not());
}

#[test]
fn test_secret_set_normalizes_name() {
    let temp_dir = TempDir::new().unwrap();

    dotveil(temp_dir.path())
        .args(["secret", "set", "stripe key", "--value", "v"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored as STRIPE_KEY"));
}

#[test]
fn test_secret_set_rejects_unusable_name() {
    let temp_dir = TempDir::new().unwrap();

    dotveil(temp_dir.path())
        .args(["secret", "set", "---", "--value", "v"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("placeholder name"));
}

#[test]
fn test_secret_unset() {
    let temp_dir = TempDir::new().unwrap();

    dotveil(temp_dir.path())
        .args(["secret", "set", "KEY", "--value", "v"])
        .assert()
        .success();

    dotveil(temp_dir.path())
        .args(["secret", "unset", "KEY"])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));

    dotveil(temp_dir.path())
        .args(["secret", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No secrets stored"));
}

#[test]
fn test_corrupt_store_is_loud_not_empty() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("secrets.json"), "{not valid json").unwrap();

    dotveil(temp_dir.path())
        .args(["secret", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("refusing to treat it as empty"));
}

#[cfg(unix)]
#[test]
fn test_store_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    dotveil(temp_dir.path())
        .args(["secret", "set", "KEY", "--value", "v"])
        .assert()
        .success();

    let mode = fs::metadata(temp_dir.path().join("secrets.json"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_map_set_and_list() {
    let temp_dir = TempDir::new().unwrap();

    dotveil(temp_dir.path())
        .args([
            "map",
            "set",
            "DB_PASSWORD",
            "onepassword",
            "--path",
            "op://Private/db/password",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("onepassword"));

    dotveil(temp_dir.path())
        .args(["map", "set", "DB_PASSWORD", "local"])
        .assert()
        .success();

    dotveil(temp_dir.path())
        .args(["map", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DB_PASSWORD"))
        .stdout(predicate::str::contains("op://Private/db/password"));

    // Wire format: { NAME: { backendId: path | true } }
    let raw = fs::read_to_string(temp_dir.path().join("mappings.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["DB_PASSWORD"]["local"], serde_json::json!(true));
}

#[test]
fn test_map_set_rejects_unknown_backend() {
    let temp_dir = TempDir::new().unwrap();

    dotveil(temp_dir.path())
        .args(["map", "set", "KEY", "vault"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown backend"));
}
