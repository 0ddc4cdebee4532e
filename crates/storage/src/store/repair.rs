#![forbid(unsafe_code)]

use super::*;

use ns_core::tree::{BoundsPatch, TreeNode, assign_bounds};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
struct FlatNode {
    id: i64,
    parent_id: Option<i64>,
    lft: Option<i64>,
    rgt: Option<i64>,
}

impl TreeNode for FlatNode {
    fn node_id(&self) -> i64 {
        self.id
    }

    fn tree_parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn tree_bounds(&self) -> Option<Bounds> {
        match (self.lft, self.rgt) {
            (Some(lft), Some(rgt)) => Some(Bounds::new(lft, rgt)),
            _ => None,
        }
    }
}

impl NestedSetStore {
    // Rebuilds the interval encoding of a whole scope, or of one subtree,
    // from parent pointers and the existing lft order alone. Returns the
    // number of rows written, including rows shifted by the surrounding gap
    // adjustment in subtree mode.
    pub fn fix_tree(&mut self, scope: &ScopeId, root: Option<i64>) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let changed = fix_tree_tx(&tx, scope, root)?;
        tx.commit()?;
        Ok(changed)
    }

    // Reconciles an externally supplied hierarchy against the stored nodes,
    // then runs the same bound assignment as fix_tree once at the end. An
    // entry id with no stored counterpart fails the whole call before commit.
    pub fn rebuild_tree(
        &mut self,
        scope: &ScopeId,
        data: Vec<NodeSpec>,
        delete: bool,
        root: Option<i64>,
    ) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;

        let subtree = match root {
            Some(root_id) => {
                let row = require_node(&tx, scope, root_id)?;
                Some(require_bounds(&row)?)
            }
            None => None,
        };

        let mut existing: BTreeMap<i64, FlatNode> = load_flat(&tx, scope, subtree)?
            .into_iter()
            .map(|node| (node.id, node))
            .collect();

        let mut stack: Vec<(NodeSpec, Option<i64>)> = Vec::new();
        for spec in data.into_iter().rev() {
            stack.push((spec, root));
        }

        while let Some((spec, parent_id)) = stack.pop() {
            let payload = spec.payload.to_string();
            let id = match spec.id {
                Some(id) => {
                    if existing.remove(&id).is_none() {
                        return Err(StoreError::UnknownNode);
                    }
                    tx.execute(
                        "UPDATE nodes SET parent_id=?3, payload=?4 WHERE scope=?1 AND id=?2",
                        params![scope.as_str(), id, parent_id, payload],
                    )?;
                    id
                }
                None => {
                    tx.execute(
                        "INSERT INTO nodes(scope, parent_id, payload) VALUES (?1, ?2, ?3)",
                        params![scope.as_str(), parent_id, payload],
                    )?;
                    tx.last_insert_rowid()
                }
            };

            for child in spec.children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        // Stored nodes the data never mentioned: soft-delete them on request,
        // otherwise leave them in place for the assignment pass.
        if delete {
            let deleted_at_ms = now_ms();
            for id in existing.keys() {
                tx.execute(
                    "UPDATE nodes SET deleted_at_ms=?3 \
                     WHERE scope=?1 AND id=?2 AND deleted_at_ms IS NULL",
                    params![scope.as_str(), id, deleted_at_ms],
                )?;
            }
        }

        let changed = fix_tree_tx(&tx, scope, root)?;
        tx.commit()?;
        Ok(changed)
    }
}

fn fix_tree_tx(
    tx: &Transaction<'_>,
    scope: &ScopeId,
    root: Option<i64>,
) -> Result<usize, StoreError> {
    match root {
        None => {
            let nodes = load_flat(tx, scope, None)?;
            let (patches, _) = assign_bounds(nodes, None, 1);
            write_patches_tx(tx, scope, &patches)
        }
        Some(root_id) => {
            let root_row = require_node(tx, scope, root_id)?;
            let bounds = require_bounds(&root_row)?;

            let nodes = load_flat(tx, scope, Some(bounds))?;
            let (patches, new_rgt) = assign_bounds(nodes, Some(root_id), bounds.lft + 1);

            let mut changed = 0;
            if new_rgt != bounds.rgt {
                // The subtree changed size: shift everything past the old
                // close bound before touching the root, so siblings and
                // ancestors stay consistent.
                changed += make_gap_tx(tx, scope, bounds.rgt + 1, new_rgt - bounds.rgt)?;
                tx.execute(
                    "UPDATE nodes SET rgt=?3 WHERE scope=?1 AND id=?2",
                    params![scope.as_str(), root_id, new_rgt],
                )?;
                changed += 1;
            }

            changed += write_patches_tx(tx, scope, &patches)?;
            Ok(changed)
        }
    }
}

// Candidates for bound assignment. The assignment pass orders them itself,
// keeping existing left bounds first so fresh inserts land after their
// siblings. In subtree mode rows with unassigned bounds are included as
// well: they cannot be interval-matched, and the walk re-parents any that
// do not belong.
fn load_flat(
    conn: &Connection,
    scope: &ScopeId,
    subtree: Option<Bounds>,
) -> Result<Vec<FlatNode>, StoreError> {
    let (sql, bounds) = match subtree {
        None => (
            "SELECT id, parent_id, lft, rgt FROM nodes WHERE scope=?1".to_string(),
            (0, 0),
        ),
        Some(bounds) => (
            "SELECT id, parent_id, lft, rgt FROM nodes \
             WHERE scope=?1 AND ((lft > ?2 AND rgt < ?3) OR lft IS NULL OR rgt IS NULL)"
                .to_string(),
            (bounds.lft, bounds.rgt),
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = if subtree.is_some() {
        stmt.query(params![scope.as_str(), bounds.0, bounds.1])?
    } else {
        stmt.query(params![scope.as_str()])?
    };

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(FlatNode {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            lft: row.get(2)?,
            rgt: row.get(3)?,
        });
    }
    Ok(out)
}

// Writes only rows whose computed bounds or parent differ from storage; the
// WHERE clause makes a repeated run a no-op.
fn write_patches_tx(
    tx: &Transaction<'_>,
    scope: &ScopeId,
    patches: &[BoundsPatch],
) -> Result<usize, StoreError> {
    let mut stmt = tx.prepare(
        "UPDATE nodes SET lft=?3, rgt=?4, parent_id=?5 \
         WHERE scope=?1 AND id=?2 \
           AND (lft IS NOT ?3 OR rgt IS NOT ?4 OR parent_id IS NOT ?5)",
    )?;

    let mut changed = 0;
    for patch in patches {
        changed += stmt.execute(params![
            scope.as_str(),
            patch.id,
            patch.lft,
            patch.rgt,
            patch.parent_id,
        ])?;
    }
    Ok(changed)
}
