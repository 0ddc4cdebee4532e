#![forbid(unsafe_code)]

use super::*;

// Read surface. Soft-deleted rows are filtered out; every listing is ordered
// by lft ascending, which is a pre-order walk of the forest.
impl NestedSetStore {
    pub fn ancestors_of(
        &self,
        scope: &ScopeId,
        id: i64,
        include_self: bool,
    ) -> Result<Vec<NodeRow>, StoreError> {
        let node = require_node(&self.conn, scope, id)?;
        let bounds = require_bounds(&node)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes \
             WHERE scope=?1 AND ?2 BETWEEN lft AND rgt AND deleted_at_ms IS NULL \
               AND (?3 OR id <> ?4) \
             ORDER BY lft ASC"
        ))?;
        collect_rows(stmt.query(params![scope.as_str(), bounds.rgt, include_self, id])?)
    }

    pub fn descendants_of(
        &self,
        scope: &ScopeId,
        id: i64,
        include_self: bool,
    ) -> Result<Vec<NodeRow>, StoreError> {
        let node = require_node(&self.conn, scope, id)?;
        let bounds = require_bounds(&node)?;
        let from = if include_self {
            bounds.lft
        } else {
            bounds.lft + 1
        };

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes \
             WHERE scope=?1 AND lft BETWEEN ?2 AND ?3 AND deleted_at_ms IS NULL \
             ORDER BY lft ASC"
        ))?;
        collect_rows(stmt.query(params![scope.as_str(), from, bounds.rgt])?)
    }

    pub fn children_of(&self, scope: &ScopeId, id: i64) -> Result<Vec<NodeRow>, StoreError> {
        require_node(&self.conn, scope, id)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes \
             WHERE scope=?1 AND parent_id=?2 AND deleted_at_ms IS NULL \
             ORDER BY lft ASC"
        ))?;
        collect_rows(stmt.query(params![scope.as_str(), id])?)
    }

    pub fn siblings_of(&self, scope: &ScopeId, id: i64) -> Result<Vec<NodeRow>, StoreError> {
        let node = require_node(&self.conn, scope, id)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes \
             WHERE scope=?1 AND parent_id IS ?2 AND id <> ?3 AND deleted_at_ms IS NULL \
             ORDER BY lft ASC"
        ))?;
        collect_rows(stmt.query(params![scope.as_str(), node.parent_id, id])?)
    }

    // Nearest node by lft in either direction, with no sibling restriction.
    pub fn next_of(&self, scope: &ScopeId, id: i64) -> Result<Option<NodeRow>, StoreError> {
        let node = require_node(&self.conn, scope, id)?;
        let bounds = require_bounds(&node)?;

        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {NODE_COLUMNS} FROM nodes \
                     WHERE scope=?1 AND lft > ?2 AND deleted_at_ms IS NULL \
                     ORDER BY lft ASC LIMIT 1"
                ),
                params![scope.as_str(), bounds.lft],
                read_node_row,
            )
            .optional()?)
    }

    pub fn prev_of(&self, scope: &ScopeId, id: i64) -> Result<Option<NodeRow>, StoreError> {
        let node = require_node(&self.conn, scope, id)?;
        let bounds = require_bounds(&node)?;

        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {NODE_COLUMNS} FROM nodes \
                     WHERE scope=?1 AND lft < ?2 AND lft IS NOT NULL AND deleted_at_ms IS NULL \
                     ORDER BY lft DESC LIMIT 1"
                ),
                params![scope.as_str(), bounds.lft],
                read_node_row,
            )
            .optional()?)
    }

    pub fn roots(&self, scope: &ScopeId) -> Result<Vec<NodeRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes \
             WHERE scope=?1 AND parent_id IS NULL AND deleted_at_ms IS NULL \
             ORDER BY lft ASC"
        ))?;
        collect_rows(stmt.query(params![scope.as_str()])?)
    }

    pub fn leaves(&self, scope: &ScopeId) -> Result<Vec<NodeRow>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes \
             WHERE scope=?1 AND rgt = lft + 1 AND deleted_at_ms IS NULL \
             ORDER BY lft ASC"
        ))?;
        collect_rows(stmt.query(params![scope.as_str()])?)
    }

    // Depth is the number of intervals strictly containing the node: the
    // correlated count includes the node itself, hence the minus one.
    pub fn with_depth(&self, scope: &ScopeId) -> Result<Vec<NodeWithDepth>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT n.id, n.scope, n.parent_id, n.lft, n.rgt, n.payload, n.deleted_at_ms, \
               (SELECT COUNT(1) FROM nodes a \
                WHERE a.scope = n.scope AND n.lft BETWEEN a.lft AND a.rgt) - 1 AS depth \
             FROM nodes n \
             WHERE n.scope=?1 AND n.lft IS NOT NULL AND n.deleted_at_ms IS NULL \
             ORDER BY n.lft ASC",
        )?;

        let mut rows = stmt.query(params![scope.as_str()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(NodeWithDepth {
                node: read_node_row(row)?,
                depth: row.get(7)?,
            });
        }
        Ok(out)
    }
}

fn collect_rows(mut rows: rusqlite::Rows<'_>) -> Result<Vec<NodeRow>, StoreError> {
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(read_node_row(row)?);
    }
    Ok(out)
}
