//! End-to-end runs of the `arbor` binary against a temp store directory.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn arbor(store: &Path) -> Command {
    let mut cmd = Command::cargo_bin("arbor").unwrap();
    cmd.arg("--store").arg(store).env_remove("ARBOR_LOG");
    cmd
}

fn json(store: &Path, args: &[&str]) -> Value {
    let out = arbor(store).arg("--json").args(args).output().unwrap();
    assert!(out.status.success(), "arbor {args:?} failed: {}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).unwrap()
}

#[test]
fn add_nested_and_search_with_ancestors() {
    let dir = TempDir::new().unwrap();
    let store = dir.path();

    let root = json(store, &["add", "Electronics", "-d", "Devices"]);
    assert_eq!(root["categoryId"], "CAT1");
    assert_eq!(root["hierarchyLevel"], 0);

    let child = json(store, &["add", "Phones", "-d", "Mobile", "--parent", "CAT1", "-t", "sale"]);
    assert_eq!(child["categoryId"], "CAT1.1");
    assert_eq!(child["parentId"], root["id"]);

    let hits = json(store, &["search", "phone"]);
    let names: Vec<&str> = hits.as_array().unwrap().iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Electronics", "Phones"]);

    assert!(store.join("categories.json").exists());
}

#[test]
fn validation_and_not_found_have_distinct_exit_codes() {
    let dir = TempDir::new().unwrap();
    let store = dir.path();
    json(store, &["add", "A", "-d", "a"]);
    json(store, &["add", "B", "-d", "b", "--parent", "CAT1"]);

    arbor(store).args(["delete", "CAT1"]).assert().code(2);
    arbor(store).args(["add", "A", "-d", "again"]).assert().code(2);
    arbor(store).args(["show", "CAT9"]).assert().code(3);
    arbor(store).args(["reset"]).assert().code(2);

    let stats = json(store, &["stats"]);
    assert_eq!(stats["total"], 2);
}

#[test]
fn delete_then_restore_by_index() {
    let dir = TempDir::new().unwrap();
    let store = dir.path();
    json(store, &["add", "Only", "-d", "x"]);

    let entry = json(store, &["delete", "CAT1", "--reason", "cleanup"]);
    assert_eq!(entry["categoryName"], "Only");
    assert_eq!(json(store, &["deleted"]).as_array().unwrap().len(), 1);

    let restored = json(store, &["restore", "0"]);
    assert_eq!(restored["status"], "active");
    assert!(json(store, &["deleted"]).as_array().unwrap().is_empty());
}

#[test]
fn import_then_export_csv() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store");
    let input = dir.path().join("in.json");
    fs::write(
        &input,
        r#"[{"id": 1, "name": "Kitchen", "description": "Cooking"},
            {"id": 2, "name": "Knives", "description": "Sharp", "parentId": 1}]"#,
    )
    .unwrap();

    let report = json(&store, &["import", input.to_str().unwrap()]);
    assert_eq!(report["created"].as_array().unwrap().len(), 2);
    assert_eq!(report["detached"], 0);

    let out = dir.path().join("out/export.csv");
    arbor(&store)
        .args(["export", "--format", "csv", "--out", out.to_str().unwrap()])
        .assert()
        .success();
    let csv = fs::read_to_string(&out).unwrap();
    assert!(csv.contains("CAT1.1"));
    assert!(csv.contains("Knives"));

    let check = json(&store, &["check"]);
    assert_eq!(check["ok"], true);
}
