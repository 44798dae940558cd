//! Smoke tests -- verify the binary runs and the record commands work end to end.

use assert_cmd::Command;
use predicates::prelude::*;

fn flowtest(db: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("flowtest").unwrap();
    cmd.env_remove("FLOWTEST_CONFIG")
        .env("RUST_LOG", "warn")
        .arg("--db")
        .arg(db);
    cmd
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("flowtest")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Local-first record store"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("flowtest")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("flowtest"));
}

#[test]
fn test_tests_list_shows_seeds() {
    let dir = tempfile::tempdir().unwrap();
    flowtest(&dir.path().join("cli.db"))
        .args(["tests", "list"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Login Flow - Happy Path"))
        .stdout(predicates::str::contains("Search Functionality"));
}

#[test]
fn test_create_then_stats_json() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");

    flowtest(&db)
        .args(["tests", "create", "--name", "Smoke", "--environment", "dev"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Test 'Smoke' created"));

    flowtest(&db)
        .args(["stats", "--json"])
        .assert()
        .success()
        .stdout(predicates::str::contains("\"total\": 5"))
        .stdout(predicates::str::contains("\"pending\": 2"));
}

#[test]
fn test_update_missing_fails() {
    let dir = tempfile::tempdir().unwrap();
    flowtest(&dir.path().join("cli.db"))
        .args(["tests", "update", "nope", "--status", "passed"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("Test not found: nope"));
}

#[test]
fn test_record_saves_test_and_run() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");

    flowtest(&db)
        .args([
            "record",
            "--name",
            "Recorded login",
            "--step",
            "Navigate to https://example.com|page.goto()|passed",
            "--step",
            "Assert text contains 'Welcome'|h1.welcome-message|warning",
        ])
        .assert()
        .success()
        .stdout(predicates::str::contains("2 steps, 1 passed, 0 failed, 1 warnings"));

    flowtest(&db)
        .args(["runs", "list", "--json"])
        .assert()
        .success()
        .stdout(predicates::str::contains("h1.welcome-message"));
}

#[test]
fn test_reset_reseeds() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("cli.db");

    flowtest(&db)
        .args(["tests", "delete", "1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Test '1' deleted."));

    flowtest(&db)
        .arg("reset")
        .assert()
        .success()
        .stdout(predicates::str::contains("Removed 1 stored key(s)."));

    flowtest(&db)
        .args(["tests", "show", "1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("Login Flow - Happy Path"));
}

#[test]
fn test_settings_set_rejects_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("settings.json");
    std::fs::write(
        &file,
        r#"{"workspace": "", "storage": "relative", "headlessMode": true, "autoSave": true,
            "screenshotOnFailure": false, "timeout": 30000}"#,
    )
    .unwrap();

    flowtest(&dir.path().join("cli.db"))
        .args(["settings", "set", "--file"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicates::str::contains("Workspace name is required"))
        .stderr(predicates::str::contains("2 invalid field(s)"));
}

#[test]
fn test_serve_subcommand_exists() {
    Command::cargo_bin("flowtest")
        .unwrap()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"));
}
