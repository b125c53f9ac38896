//! End-to-end tests driving the `datastore` binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::{Value, json};

fn datastore(db: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_datastore"));
    cmd.arg("--db")
        .arg(db)
        .env_remove("DATASTORE_DB")
        .env_remove("DATASTORE_PROFILE")
        .env("DATASTORE_LOG", "error")
        .env_remove("RUST_LOG");
    cmd
}

fn run(db: &Path, args: &[&str]) -> Output {
    datastore(db).args(args).output().expect("failed to run datastore")
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

// ═══════════════════════════════════════════════════════════════════════
// One-shot commands
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("nested/ds.db");

    let out = stdout_json(&run(&db, &["init"]));
    assert_eq!(out["path"], json!(db));
    assert!(db.exists());
}

#[test]
fn create_find_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ds.db");

    let path = stdout_json(&run(
        &db,
        &["create", "--data", "hello", "--prop", "title=Foo", "--prop", "author=Bar"],
    ));
    assert_eq!(path, json!("/org/laptop/sugar/DataStore/Object/1"));

    let found = stdout_json(&run(&db, &["find", "title=Foo"]));
    assert_eq!(found, json!(["/org/laptop/sugar/DataStore/Object/1"]));

    let props = stdout_json(&run(&db, &["get-properties", "1"]));
    assert_eq!(props, json!({"title": "Foo", "author": "Bar", "uid": "1"}));

    let raw = run(&db, &["get-data", "1", "--raw"]);
    assert!(raw.status.success());
    assert_eq!(raw.stdout, b"hello");

    let status = stdout_json(&run(&db, &["status"]));
    assert_eq!(status["objects"], 1);
    assert_eq!(status["properties"], 2);
}

#[test]
fn set_properties_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ds.db");
    stdout_json(&run(&db, &["create", "--prop", "title=Foo"]));

    stdout_json(&run(&db, &["set-properties", "1", "title=", "mime=text/plain"]));
    let props = stdout_json(&run(&db, &["get-properties", "1"]));
    assert_eq!(props, json!({"mime": "text/plain", "uid": "1"}));

    stdout_json(&run(&db, &["delete", "/org/laptop/sugar/DataStore/Object/1"]));
    let missing = run(&db, &["get", "1"]);
    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("NotFoundError"));
}

#[test]
fn data_file_is_stored_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ds.db");
    let blob = dir.path().join("blob.bin");
    std::fs::write(&blob, [0u8, 159, 146, 150]).unwrap();

    stdout_json(&run(&db, &["create", "--data-file", blob.to_str().unwrap()]));
    let data = stdout_json(&run(&db, &["get-data", "1"]));
    assert_eq!(data, json!([0, 159, 146, 150]));
}

#[test]
fn unusable_database_exits_with_code_one() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let out = run(&blocker.join("ds.db"), &["status"]);
    assert_eq!(out.status.code(), Some(1));
}

// ═══════════════════════════════════════════════════════════════════════
// serve
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn serve_answers_requests_and_emits_signals() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("ds.db");

    let mut child = datastore(&db)
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    {
        let stdin = child.stdin.as_mut().unwrap();
        writeln!(
            stdin,
            r#"{{"id":1,"method":"create","params":{{"data":"x","properties":{{"title":"Foo"}}}}}}"#
        )
        .unwrap();
        writeln!(stdin).unwrap();
        writeln!(stdin, r#"{{"id":2,"method":"find","params":{{"properties":{{"title":"Foo"}}}}}}"#).unwrap();
        writeln!(stdin, "not json").unwrap();
    }
    drop(child.stdin.take());

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let lines: Vec<Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[0]["result"], "/org/laptop/sugar/DataStore/Object/1");
    assert_eq!(lines[1]["signal"], "Updated");
    assert_eq!(lines[1]["data"], true);
    assert_eq!(lines[2]["result"], json!(["/org/laptop/sugar/DataStore/Object/1"]));
    assert_eq!(lines[3]["error"]["kind"], "InvalidRequest");
}
