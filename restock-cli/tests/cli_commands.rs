use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

use restock_core::{registry, StoreId, StoreRecord, StoreRepository};
use tempfile::TempDir;

fn restock_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("restock"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("RESTOCK_REPORT_RECIPIENT")
        .env_remove("FIRESTORE_EMULATOR_HOST");
    cmd
}

fn seed_store(home: &Path, id: &str, name: &str) {
    let mut book = registry::load_at(home).unwrap();
    book.upsert(StoreRecord {
        store_id: StoreId::from(id),
        name: name.into(),
        address: "Shibuya".into(),
        pending_sync: false,
        last_synced_at: None,
    })
    .unwrap();
    registry::save_at(home, &book).unwrap();
}

#[test]
fn init_creates_registry_and_config_once() {
    let home = TempDir::new().unwrap();
    restock_cmd(home.path())
        .args(["init", "--project-id", "bookbox"])
        .assert()
        .success()
        .stdout(contains("Config written"));

    assert!(home.path().join(".restock/registry.yaml").exists());
    let config = std::fs::read_to_string(home.path().join(".restock/config.yaml")).unwrap();
    assert!(config.contains("bookbox"));

    restock_cmd(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(contains("already present"));
}

#[test]
fn survey_add_appends_valid_rows_only() {
    let home = TempDir::new().unwrap();
    restock_cmd(home.path()).arg("init").assert().success();

    restock_cmd(home.path())
        .args([
            "survey",
            "add",
            "--name",
            "Book Cafe",
            "--location",
            "Shibuya",
            "--frequency",
            "初めて",
            "--continuity",
            "自分が設置にいけば",
        ])
        .assert()
        .success()
        .stdout(contains("Survey row 1 recorded"));

    restock_cmd(home.path())
        .args([
            "survey",
            "add",
            "--name",
            "Book Cafe",
            "--location",
            "Shibuya",
            "--frequency",
            "sometimes",
            "--continuity",
            "self",
        ])
        .assert()
        .failure()
        .stderr(contains("sometimes"));

    assert_eq!(registry::load_at(home.path()).unwrap().survey.len(), 1);
}

#[test]
fn flag_marks_rows_and_reports_unknown_ids() {
    let home = TempDir::new().unwrap();
    restock_cmd(home.path()).arg("init").assert().success();
    seed_store(home.path(), "11001", "Alpha");

    restock_cmd(home.path())
        .args(["flag", "11001"])
        .assert()
        .success()
        .stdout(contains("11001 flagged"));
    let book = registry::load_at(home.path()).unwrap();
    assert!(book.get(&StoreId::from("11001")).unwrap().unwrap().pending_sync);

    restock_cmd(home.path())
        .args(["flag", "99999"])
        .assert()
        .failure()
        .stderr(contains("99999"));

    restock_cmd(home.path())
        .args(["flag", "--clear", "11001"])
        .assert()
        .success();
    let book = registry::load_at(home.path()).unwrap();
    assert!(!book.get(&StoreId::from("11001")).unwrap().unwrap().pending_sync);
}

#[test]
fn status_json_lists_stores_and_summary() {
    let home = TempDir::new().unwrap();
    restock_cmd(home.path()).arg("init").assert().success();
    seed_store(home.path(), "11001", "Alpha");
    seed_store(home.path(), "21002", "Beta");
    restock_cmd(home.path()).args(["flag", "21002"]).assert().success();

    let output = restock_cmd(home.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["stores"], 2);
    assert_eq!(json["summary"]["flagged"], 1);
    assert_eq!(json["stores"][1]["store_id"], "21002");
}

#[test]
fn status_names_duplicated_ids_and_lists_the_rest() {
    let home = TempDir::new().unwrap();
    restock_cmd(home.path()).arg("init").assert().success();
    seed_store(home.path(), "11001", "Alpha");
    let mut book = registry::load_at(home.path()).unwrap();
    let row = restock_core::types::StoreRow {
        store_id: Some(StoreId::from("11002")),
        name: "Beta".into(),
        ..Default::default()
    };
    book.stores.push(row.clone());
    book.stores.push(row);
    registry::save_at(home.path(), &book).unwrap();

    let output = restock_cmd(home.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["stores"], 1);
    assert_eq!(json["duplicates"][0], "11002");

    restock_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("store id 11002 is held by more than one row"));
}

#[test]
fn lookup_refuses_malformed_ids_before_touching_the_store() {
    let home = TempDir::new().unwrap();
    restock_cmd(home.path()).arg("init").assert().success();
    restock_cmd(home.path())
        .args(["lookup", "../stores/11007"])
        .assert()
        .failure()
        .stderr(contains("is not a store id"));
}

#[test]
fn status_table_shows_pending_rows() {
    let home = TempDir::new().unwrap();
    restock_cmd(home.path()).arg("init").assert().success();
    seed_store(home.path(), "11001", "Alpha");
    restock_cmd(home.path()).args(["flag", "11001"]).assert().success();

    restock_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("1 stores | 1 flagged"))
        .stdout(contains("Alpha"))
        .stdout(contains("restock sync"));
}

#[test]
fn delete_without_yes_only_lists_flagged_rows() {
    let home = TempDir::new().unwrap();
    restock_cmd(home.path()).arg("init").assert().success();
    seed_store(home.path(), "11001", "Alpha");
    restock_cmd(home.path()).args(["flag", "11001"]).assert().success();

    restock_cmd(home.path())
        .arg("delete")
        .assert()
        .success()
        .stdout(contains("[dry-run] 1 flagged stores would be deleted"))
        .stdout(contains("11001 Alpha"));
    assert_eq!(registry::load_at(home.path()).unwrap().list().unwrap().len(), 1);
}

#[test]
fn commands_before_init_point_at_init() {
    let home = TempDir::new().unwrap();
    restock_cmd(home.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("restock init"));
}
