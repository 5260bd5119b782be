use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn shopsync(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("shopsync").unwrap();
    cmd.arg("--home")
        .arg(home.path())
        .env_remove("SHOPSYNC_ACCESS_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("shopsync")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("push-all"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_status_json_on_fresh_home() {
    let home = TempDir::new().unwrap();

    shopsync(&home)
        .args(["status", "--output", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"entities\""))
        .stdout(predicate::str::contains("\"selling-plans\""));

    assert!(home.path().join("shopsync.db").exists());
}

#[test]
fn test_push_dry_run_without_token() {
    let home = TempDir::new().unwrap();

    shopsync(&home)
        .args(["push", "customers", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to push"));
}

#[test]
fn test_push_without_shop_domain_fails() {
    let home = TempDir::new().unwrap();

    shopsync(&home)
        .args(["push-all"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("shop_domain"));
}

#[test]
fn test_requeue_missing_record() {
    let home = TempDir::new().unwrap();

    shopsync(&home)
        .args(["requeue", "products", "7"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn test_resolve_needs_a_choice() {
    let home = TempDir::new().unwrap();

    shopsync(&home)
        .args(["resolve", "customers", "1"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_config_reports_path() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("config.yaml"), "sync: [1, 2]").unwrap();

    shopsync(&home)
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config.yaml"));
}

#[test]
fn test_completions_bash() {
    Command::cargo_bin("shopsync")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shopsync"));
}
