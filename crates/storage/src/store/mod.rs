#![forbid(unsafe_code)]

mod check;
mod error;
mod mutate;
mod query;
mod remove;
mod repair;
mod requests;

pub use error::StoreError;
pub use requests::*;

use ns_core::ids::ScopeId;
use ns_core::tree::Bounds;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA_VERSION: i64 = 1;
const DB_FILE: &str = "nested_set.db";

const NODE_COLUMNS: &str = "id, scope, parent_id, lft, rgt, payload, deleted_at_ms";

#[derive(Debug)]
pub struct NestedSetStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl NestedSetStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let conn = Connection::open(storage_dir.join(DB_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        preflight_gate(&conn)?;
        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn node(&self, scope: &ScopeId, id: i64) -> Result<Option<NodeRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE scope=?1 AND id=?2"),
                params![scope.as_str(), id],
                read_node_row,
            )
            .optional()?)
    }
}

fn read_node_row(row: &rusqlite::Row<'_>) -> Result<NodeRow, rusqlite::Error> {
    let payload_text: String = row.get(5)?;
    let payload = serde_json::from_str(&payload_text).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(NodeRow {
        id: row.get(0)?,
        scope: row.get(1)?,
        parent_id: row.get(2)?,
        lft: row.get(3)?,
        rgt: row.get(4)?,
        payload,
        deleted_at_ms: row.get(6)?,
    })
}

// Anchors are looked up without the scope predicate first so a node that
// exists in another scope reports ScopeMismatch instead of UnknownNode.
fn require_node(conn: &Connection, scope: &ScopeId, id: i64) -> Result<NodeRow, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id=?1"),
            params![id],
            read_node_row,
        )
        .optional()?;

    let Some(row) = row else {
        return Err(StoreError::UnknownNode);
    };
    if row.scope != scope.as_str() {
        return Err(StoreError::ScopeMismatch {
            expected: scope.as_str().to_string(),
            actual: row.scope,
        });
    }
    Ok(row)
}

fn require_bounds(row: &NodeRow) -> Result<Bounds, StoreError> {
    row.bounds().ok_or(StoreError::NodeNotPersisted)
}

fn max_rgt(conn: &Connection, scope: &ScopeId) -> Result<Option<i64>, StoreError> {
    Ok(conn.query_row(
        "SELECT MAX(rgt) FROM nodes WHERE scope=?1",
        params![scope.as_str()],
        |row| row.get::<_, Option<i64>>(0),
    )?)
}

fn make_gap_tx(
    tx: &Transaction<'_>,
    scope: &ScopeId,
    cut: i64,
    height: i64,
) -> Result<usize, StoreError> {
    Ok(tx.execute(
        "UPDATE nodes SET \
         lft = CASE WHEN lft >= ?2 THEN lft + ?3 ELSE lft END, \
         rgt = CASE WHEN rgt >= ?2 THEN rgt + ?3 ELSE rgt END \
         WHERE scope=?1 AND (lft >= ?2 OR rgt >= ?2)",
        params![scope.as_str(), cut, height],
    )?)
}

fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = ["store_state", "nodes"].into_iter().collect();

    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS nodes (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          scope TEXT NOT NULL,
          parent_id INTEGER,
          lft INTEGER,
          rgt INTEGER,
          payload TEXT NOT NULL DEFAULT '{}',
          deleted_at_ms INTEGER
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_scope_lft ON nodes(scope, lft);
        CREATE INDEX IF NOT EXISTS idx_nodes_scope_rgt ON nodes(scope, rgt);
        CREATE INDEX IF NOT EXISTS idx_nodes_scope_parent ON nodes(scope, parent_id);
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms()],
    )?;

    Ok(())
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
