#![forbid(unsafe_code)]

use super::*;

impl NestedSetStore {
    // Hard removal deletes the whole subtree and closes the vacated interval.
    // Soft removal stamps the subtree and leaves every bound in place so the
    // shape survives for restore.
    pub fn remove(
        &mut self,
        scope: &ScopeId,
        id: i64,
        mode: RemoveMode,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;

        let node = require_node(&tx, scope, id)?;
        let bounds = require_bounds(&node)?;

        let affected = match mode {
            RemoveMode::Hard => {
                let deleted = tx.execute(
                    "DELETE FROM nodes WHERE scope=?1 AND lft BETWEEN ?2 AND ?3",
                    params![scope.as_str(), bounds.lft, bounds.rgt],
                )?;
                make_gap_tx(&tx, scope, bounds.rgt + 1, -bounds.height())?;
                deleted
            }
            RemoveMode::Soft { deleted_at_ms } => {
                // Descendants that were already deleted keep their earlier
                // stamp; restore relies on it to leave them excluded.
                tx.execute(
                    "UPDATE nodes SET deleted_at_ms=?4 \
                     WHERE scope=?1 AND lft BETWEEN ?2 AND ?3 AND deleted_at_ms IS NULL",
                    params![scope.as_str(), bounds.lft, bounds.rgt, deleted_at_ms],
                )?
            }
        };

        tx.commit()?;
        Ok(affected)
    }

    // Re-opens the node and every descendant deleted no earlier than the node
    // itself. A descendant removed before its ancestor stays deleted.
    pub fn restore(&mut self, scope: &ScopeId, id: i64) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;

        let node = require_node(&tx, scope, id)?;
        let bounds = require_bounds(&node)?;
        let Some(deleted_at_ms) = node.deleted_at_ms else {
            return Err(StoreError::InvalidInput("node is not deleted"));
        };

        let restored = tx.execute(
            "UPDATE nodes SET deleted_at_ms=NULL \
             WHERE scope=?1 AND lft BETWEEN ?2 AND ?3 AND deleted_at_ms >= ?4",
            params![scope.as_str(), bounds.lft, bounds.rgt, deleted_at_ms],
        )?;

        tx.commit()?;
        Ok(restored)
    }
}
