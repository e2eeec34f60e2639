//! E2E CLI tests for the snapshot commands and error contract.
//!
//! Each test runs the `muster` binary against a scratch database and an
//! unreachable bot endpoint. Snapshots are seeded through the library with
//! a fake bot so no network is needed.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use muster_core::archive::ArchiveSettings;
use muster_core::model::{MemberRecord, SnapshotKind};
use muster_core::remote::fake::FakeGroupApi;
use muster_core::snapshot::SnapshotManager;
use muster_core::store::SqliteStore;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const GROUP: i64 = 777;

fn muster_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("muster"));
    cmd.current_dir(dir);
    cmd.env("MUSTER_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd.env_remove("MUSTER_ACCESS_TOKEN");
    cmd
}

/// Write a config pointing storage into `dir` and the bot at a dead port.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("muster.toml");
    let body = format!(
        "[onebot]\nbase_url = \"http://127.0.0.1:1\"\ntimeout_secs = 1\n\n\
         [storage]\ndatabase = '{}'\narchive_dir = '{}'\n",
        dir.join("muster.sqlite3").display(),
        dir.join("snapshots").display()
    );
    std::fs::write(&path, body).expect("write config");
    path
}

fn setup() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path());
    (dir, config)
}

/// Take two snapshots of [`GROUP`]: {1, 2} then {2 (new card), 3}.
fn seed_two_snapshots(dir: &Path) -> (i64, i64) {
    let api = FakeGroupApi::new();
    let store = SqliteStore::open(&dir.join("muster.sqlite3")).expect("open store");
    let settings = ArchiveSettings {
        dir: dir.join("snapshots"),
        compress: true,
    };

    api.set_roster(
        GROUP,
        vec![
            MemberRecord::new(1, "alice"),
            MemberRecord::new(2, "bob").with_card("bobby"),
        ],
    );
    let manager = SnapshotManager::new(api, store, settings);
    let first = manager
        .create_snapshot(GROUP, SnapshotKind::Manual, "first")
        .expect("first snapshot");

    manager.api().set_roster(
        GROUP,
        vec![
            MemberRecord::new(2, "bob").with_card("robert"),
            MemberRecord::new(3, "carol"),
        ],
    );
    let second = manager
        .create_snapshot(GROUP, SnapshotKind::Manual, "second")
        .expect("second snapshot");
    (first.id, second.id)
}

fn json_stdout(output: &std::process::Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

#[test]
fn help_lists_subcommands() {
    let (dir, _config) = setup();
    muster_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("rebuild"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn empty_database_lists_nothing() {
    let (dir, config) = setup();
    for sub in ["history", "events"] {
        let output = muster_cmd(dir.path())
            .arg("--config")
            .arg(&config)
            .args([sub, "1", "--json"])
            .output()
            .expect("run");
        assert_eq!(json_stdout(&output), Value::Array(Vec::new()), "{sub}");
    }
}

#[test]
fn prune_on_empty_group_reports_zero() {
    let (dir, config) = setup();
    let output = muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["prune", "1", "--keep", "3", "--json"])
        .output()
        .expect("run");
    let json = json_stdout(&output);
    assert_eq!(json["kept"], 0);
    assert_eq!(json["deleted_snapshot_ids"], Value::Array(Vec::new()));
}

#[test]
fn history_and_diff_read_seeded_snapshots() {
    let (dir, config) = setup();
    let (first, second) = seed_two_snapshots(dir.path());

    let output = muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["history", &GROUP.to_string(), "--json"])
        .output()
        .expect("run");
    let history = json_stdout(&output);
    let rows = history.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], second);

    let output = muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["diff", &first.to_string(), &second.to_string(), "--json"])
        .output()
        .expect("run");
    let diff = json_stdout(&output);
    assert_eq!(diff["joined"][0]["user_id"], 3);
    assert_eq!(diff["left"][0]["user_id"], 1);
    assert_eq!(diff["changed_cards"][0]["user_id"], 2);

    muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["events", &GROUP.to_string(), "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("leave\t1"))
        .stdout(predicate::str::contains("join\t3"));
}

#[test]
fn export_writes_plain_json_file() {
    let (dir, config) = setup();
    let (_, second) = seed_two_snapshots(dir.path());
    let target = dir.path().join("out.json");

    muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["export", &second.to_string(), "-o"])
        .arg(&target)
        .assert()
        .success();

    let doc: Value =
        serde_json::from_str(&std::fs::read_to_string(&target).expect("read export")).expect("json");
    assert_eq!(doc["snapshot_id"], second);
    assert_eq!(doc["member_count"], 2);
}

#[test]
fn export_snapshot_as_csv() {
    let (dir, config) = setup();
    let (first, _) = seed_two_snapshots(dir.path());

    muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["export", &first.to_string(), "--as", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("user_id,display_name,group_card"))
        .stdout(predicate::str::contains("2,bob,bobby,member"));
}

#[test]
fn live_export_needs_the_bot() {
    let (dir, config) = setup();
    muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["export", "--group", "5", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E3"));
}

#[test]
fn missing_snapshot_fails_with_code() {
    let (dir, config) = setup();
    muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["preview", "404", "1", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2001]"));

    muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["export", "404"])
        .assert()
        .failure();
}

#[test]
fn rebuild_of_missing_snapshot_fails_before_prompt() {
    let (dir, config) = setup();
    muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["rebuild", "404", "1", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn unreachable_bot_fails_backup_and_records_it() {
    let (dir, config) = setup();
    muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["backup", "5", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E3"));

    let output = muster_cmd(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["history", "5", "--json"])
        .output()
        .expect("run");
    let history = json_stdout(&output);
    assert_eq!(history[0]["status"], "failed");
}

#[test]
fn missing_config_file_is_a_config_error() {
    let (dir, _config) = setup();
    muster_cmd(dir.path())
        .args(["--config", "nope.toml", "history", "1", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E1001]"));
}

#[test]
fn completions_generate_script() {
    let (dir, _config) = setup();
    muster_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("muster"));
}
