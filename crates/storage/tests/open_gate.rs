#![forbid(unsafe_code)]

use ns_core::ids::ScopeId;
use ns_core::tree::Placement;
use ns_storage::{CreateNodeRequest, NestedSetStore, StoreError};
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("ns_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn reset_required(err: StoreError) -> bool {
    match err {
        StoreError::InvalidInput(message) => message.starts_with("RESET_REQUIRED"),
        _ => false,
    }
}

#[test]
fn open_initializes_and_reopens_cleanly() {
    let dir = temp_dir("open_reopen");
    let scope = ScopeId::try_new("main").expect("scope id");

    let created = {
        let mut store = NestedSetStore::open(&dir).expect("first open");
        store
            .create(
                &scope,
                CreateNodeRequest {
                    payload: json!({ "name": "root" }),
                    placement: Placement::Root,
                },
            )
            .expect("create node")
    };

    let store = NestedSetStore::open(&dir).expect("reopen");
    let row = store
        .node(&scope, created.id)
        .expect("query")
        .expect("row survives reopen");
    assert_eq!((row.lft, row.rgt), (Some(1), Some(2)));
}

#[test]
fn open_refuses_a_database_with_foreign_tables() {
    let dir = temp_dir("open_foreign_tables");
    {
        NestedSetStore::open(&dir).expect("initialize");
    }
    Connection::open(dir.join("nested_set.db"))
        .expect("raw connection")
        .execute_batch("CREATE TABLE legacy_tree (id INTEGER PRIMARY KEY);")
        .expect("inject foreign table");

    let err = NestedSetStore::open(&dir).expect_err("gate refuses mixed schema");
    assert!(reset_required(err));
}

#[test]
fn open_refuses_a_schema_version_mismatch() {
    let dir = temp_dir("open_version_mismatch");
    {
        NestedSetStore::open(&dir).expect("initialize");
    }
    Connection::open(dir.join("nested_set.db"))
        .expect("raw connection")
        .execute_batch("UPDATE store_state SET schema_version = 99;")
        .expect("bump version");

    let err = NestedSetStore::open(&dir).expect_err("gate refuses newer schema");
    assert!(reset_required(err));
}

#[test]
fn open_refuses_a_missing_state_row() {
    let dir = temp_dir("open_missing_state");
    {
        NestedSetStore::open(&dir).expect("initialize");
    }
    Connection::open(dir.join("nested_set.db"))
        .expect("raw connection")
        .execute_batch("DELETE FROM store_state;")
        .expect("drop state row");

    let err = NestedSetStore::open(&dir).expect_err("gate refuses stateless schema");
    assert!(reset_required(err));
}
