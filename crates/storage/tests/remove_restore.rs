#![forbid(unsafe_code)]

use ns_core::ids::ScopeId;
use ns_core::tree::Placement;
use ns_storage::{CreateNodeRequest, NestedSetStore, NodeRow, RemoveMode, StoreError};
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

fn add(store: &mut NestedSetStore, scope: &ScopeId, name: &str, placement: Placement) -> NodeRow {
    store
        .create(
            scope,
            CreateNodeRequest {
                payload: json!({ "name": name }),
                placement,
            },
        )
        .expect("create node")
}

fn bounds_of(store: &NestedSetStore, scope: &ScopeId, id: i64) -> (i64, i64) {
    let row = store
        .node(scope, id)
        .expect("node query")
        .expect("node exists");
    (row.lft.expect("lft assigned"), row.rgt.expect("rgt assigned"))
}

#[test]
fn hard_remove_of_a_leaf_closes_the_gap() {
    let dir = temp_dir("hard_remove_leaf");
    let mut store = NestedSetStore::open(&dir).expect("open store");
    let scope = ScopeId::try_new("main").expect("scope id");

    let root = add(&mut store, &scope, "root", Placement::Root);
    let a = add(&mut store, &scope, "a", Placement::LastChildOf(root.id));
    let a1 = add(&mut store, &scope, "a1", Placement::LastChildOf(a.id));
    let b = add(&mut store, &scope, "b", Placement::LastChildOf(root.id));
    let b1 = add(&mut store, &scope, "b1", Placement::LastChildOf(b.id));

    // a1=[3,4]; every bound past it shifts down by 2.
    let removed = store
        .remove(&scope, a1.id, RemoveMode::Hard)
        .expect("remove leaf");
    assert_eq!(removed, 1);

    assert_eq!(bounds_of(&store, &scope, root.id), (1, 8));
    assert_eq!(bounds_of(&store, &scope, a.id), (2, 3));
    assert_eq!(bounds_of(&store, &scope, b.id), (4, 7));
    assert_eq!(bounds_of(&store, &scope, b1.id), (5, 6));
    assert!(store.node(&scope, a1.id).expect("query").is_none());
    assert!(!store.is_broken(&scope).expect("is_broken"));
}

#[test]
fn hard_remove_cascades_to_descendants() {
    let dir = temp_dir("hard_remove_subtree");
    let mut store = NestedSetStore::open(&dir).expect("open store");
    let scope = ScopeId::try_new("main").expect("scope id");

    let root = add(&mut store, &scope, "root", Placement::Root);
    let a = add(&mut store, &scope, "a", Placement::LastChildOf(root.id));
    let b = add(&mut store, &scope, "b", Placement::LastChildOf(root.id));
    let b1 = add(&mut store, &scope, "b1", Placement::LastChildOf(b.id));
    add(&mut store, &scope, "b2", Placement::LastChildOf(b1.id));

    let removed = store
        .remove(&scope, b.id, RemoveMode::Hard)
        .expect("remove subtree");
    assert_eq!(removed, 3);

    assert_eq!(bounds_of(&store, &scope, root.id), (1, 4));
    assert_eq!(bounds_of(&store, &scope, a.id), (2, 3));
    assert!(store.node(&scope, b1.id).expect("query").is_none());
    assert!(!store.is_broken(&scope).expect("is_broken"));

    // The vacated range is reusable immediately.
    let c = add(&mut store, &scope, "c", Placement::LastChildOf(root.id));
    assert_eq!((c.lft, c.rgt), (Some(4), Some(5)));
    assert_eq!(bounds_of(&store, &scope, root.id), (1, 6));
}

#[test]
fn soft_remove_keeps_bounds_and_stamps_descendants() {
    let dir = temp_dir("soft_remove");
    let mut store = NestedSetStore::open(&dir).expect("open store");
    let scope = ScopeId::try_new("main").expect("scope id");

    let root = add(&mut store, &scope, "root", Placement::Root);
    let a = add(&mut store, &scope, "a", Placement::LastChildOf(root.id));
    let a1 = add(&mut store, &scope, "a1", Placement::LastChildOf(a.id));

    let stamped = store
        .remove(&scope, a.id, RemoveMode::Soft { deleted_at_ms: 500 })
        .expect("soft delete");
    assert_eq!(stamped, 2);

    let a_row = store.node(&scope, a.id).expect("query").expect("row");
    assert_eq!(a_row.deleted_at_ms, Some(500));
    assert_eq!((a_row.lft, a_row.rgt), (Some(2), Some(5)));
    let a1_row = store.node(&scope, a1.id).expect("query").expect("row");
    assert_eq!(a1_row.deleted_at_ms, Some(500));

    // Bounds are untouched, so the scope is structurally intact.
    assert_eq!(bounds_of(&store, &scope, root.id), (1, 6));
    assert!(!store.is_broken(&scope).expect("is_broken"));
}

#[test]
fn restore_skips_descendants_deleted_earlier() {
    let dir = temp_dir("restore_gating");
    let mut store = NestedSetStore::open(&dir).expect("open store");
    let scope = ScopeId::try_new("main").expect("scope id");

    let root = add(&mut store, &scope, "root", Placement::Root);
    let a = add(&mut store, &scope, "a", Placement::LastChildOf(root.id));
    let a1 = add(&mut store, &scope, "a1", Placement::LastChildOf(a.id));
    let a2 = add(&mut store, &scope, "a2", Placement::LastChildOf(a.id));

    // a1 went away on its own before the subtree was deleted.
    let stamped = store
        .remove(&scope, a1.id, RemoveMode::Soft { deleted_at_ms: 100 })
        .expect("soft delete a1");
    assert_eq!(stamped, 1);
    let stamped = store
        .remove(&scope, a.id, RemoveMode::Soft { deleted_at_ms: 200 })
        .expect("soft delete a");
    assert_eq!(stamped, 2);

    let restored = store.restore(&scope, a.id).expect("restore a");
    assert_eq!(restored, 2);

    let a_row = store.node(&scope, a.id).expect("query").expect("row");
    assert!(!a_row.is_deleted());
    let a2_row = store.node(&scope, a2.id).expect("query").expect("row");
    assert!(!a2_row.is_deleted());

    // a1 was deleted before a: it stays excluded.
    let a1_row = store.node(&scope, a1.id).expect("query").expect("row");
    assert_eq!(a1_row.deleted_at_ms, Some(100));

    let restored = store.restore(&scope, a1.id).expect("restore a1");
    assert_eq!(restored, 1);
    let err = store.restore(&scope, a1.id).expect_err("already live");
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

#[test]
fn remove_preconditions() {
    let dir = temp_dir("remove_preconditions");
    let mut store = NestedSetStore::open(&dir).expect("open store");
    let scope = ScopeId::try_new("main").expect("scope id");
    let other = ScopeId::try_new("other").expect("scope id");

    let foreign = add(&mut store, &other, "foreign", Placement::Root);

    let err = store
        .remove(&scope, 9999, RemoveMode::Hard)
        .expect_err("unknown node");
    assert!(matches!(err, StoreError::UnknownNode));

    let err = store
        .remove(&scope, foreign.id, RemoveMode::Hard)
        .expect_err("node in another scope");
    assert!(matches!(err, StoreError::ScopeMismatch { .. }));
    assert!(store.node(&other, foreign.id).expect("query").is_some());
}
