mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use sqlx::Connection;
use tempfile::TempDir;

fn dedup_cmd() -> Command {
    let mut cmd = Command::cargo_bin("phenotype-dedup").expect("binary should build");
    for var in [
        "PHENODEDUP_HOST",
        "PHENODEDUP_USER",
        "PHENODEDUP_PORT",
        "PHENODEDUP_PASSWORD",
        "PHENODEDUP_DB",
        "PHENODEDUP_URL",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_cli_help_command() {
    dedup_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_cli_version_command() {
    dedup_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("phenotype-dedup"));
}

#[test]
fn test_missing_connection_flags_exit_with_config_error() {
    dedup_cmd()
        .args(["-h", "localhost", "-u", "admin"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--password"))
        .stderr(predicate::str::contains("--db"));
}

#[test]
fn test_unreachable_database_exits_with_connection_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does_not_exist.db");

    dedup_cmd()
        .args(["--url", sqlite_url(&missing, "ro").as_str(), "--no-progress"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Connection error"));
}

#[tokio::test]
async fn test_run_against_sqlite_file_writes_report() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("variation.db");
    let report_path = dir.path().join("report.json");

    let mut conn = file_db(&db_path).await;
    seed_diabetes_example(&mut conn).await;
    conn.close().await.unwrap();

    dedup_cmd()
        .args(["--url", sqlite_url(&db_path, "rw").as_str(), "--no-progress", "--report"])
        .arg(&report_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 duplicates found in 1 groups"));

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["duplicates_found"], 1);
    assert_eq!(report["updated"]["phenotype_feature"], 2);
    assert_eq!(report["deleted"]["phenotype"], 1);

    let mut conn = open_db(&db_path).await;
    assert_eq!(phenotype_ids(&mut conn).await, vec![2, 3]);
}

#[tokio::test]
async fn test_dry_run_flag_leaves_file_untouched() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("variation.db");

    let mut conn = file_db(&db_path).await;
    seed_diabetes_example(&mut conn).await;
    conn.close().await.unwrap();

    dedup_cmd()
        .args(["--url", sqlite_url(&db_path, "rw").as_str(), "--no-progress", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 -> 2"))
        .stdout(predicate::str::contains("Dry run"));

    let mut conn = open_db(&db_path).await;
    assert_eq!(phenotype_ids(&mut conn).await, vec![1, 2, 3]);
}
