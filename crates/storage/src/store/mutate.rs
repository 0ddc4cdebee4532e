#![forbid(unsafe_code)]

use super::*;

use ns_core::tree::{MovePlan, Placement};

struct ResolvedPlacement {
    position: i64,
    parent_id: Option<i64>,
}

impl NestedSetStore {
    pub fn create(
        &mut self,
        scope: &ScopeId,
        request: CreateNodeRequest,
    ) -> Result<NodeRow, StoreError> {
        let payload = request.payload.to_string();

        let tx = self.conn.transaction()?;
        let resolved = resolve_placement(&tx, scope, None, request.placement)?;

        make_gap_tx(&tx, scope, resolved.position, 2)?;
        tx.execute(
            "INSERT INTO nodes(scope, parent_id, lft, rgt, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                scope.as_str(),
                resolved.parent_id,
                resolved.position,
                resolved.position + 1,
                payload,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let row = require_node(&tx, scope, id)?;
        tx.commit()?;
        Ok(row)
    }

    pub fn move_to(
        &mut self,
        scope: &ScopeId,
        id: i64,
        placement: Placement,
    ) -> Result<NodeRow, StoreError> {
        let tx = self.conn.transaction()?;

        let node = require_node(&tx, scope, id)?;
        let bounds = require_bounds(&node)?;
        let resolved = resolve_placement(&tx, scope, Some(&node), placement)?;

        match MovePlan::compute(bounds, resolved.position) {
            Err(_) => return Err(StoreError::MoveIntoSelf),
            Ok(None) => {}
            Ok(Some(plan)) => {
                apply_move_tx(&tx, scope, &plan)?;
            }
        }

        if node.parent_id != resolved.parent_id {
            tx.execute(
                "UPDATE nodes SET parent_id=?3 WHERE scope=?1 AND id=?2",
                params![scope.as_str(), id, resolved.parent_id],
            )?;
        }

        // The move shifted this node's own bounds; re-read before returning.
        let row = require_node(&tx, scope, id)?;
        tx.commit()?;
        Ok(row)
    }

    pub fn set_payload(
        &mut self,
        scope: &ScopeId,
        id: i64,
        payload: serde_json::Value,
    ) -> Result<NodeRow, StoreError> {
        let tx = self.conn.transaction()?;
        require_node(&tx, scope, id)?;
        tx.execute(
            "UPDATE nodes SET payload=?3 WHERE scope=?1 AND id=?2",
            params![scope.as_str(), id, payload.to_string()],
        )?;
        let row = require_node(&tx, scope, id)?;
        tx.commit()?;
        Ok(row)
    }
}

fn resolve_placement(
    conn: &Connection,
    scope: &ScopeId,
    moving: Option<&NodeRow>,
    placement: Placement,
) -> Result<ResolvedPlacement, StoreError> {
    let resolved = match placement {
        Placement::Root => ResolvedPlacement {
            position: max_rgt(conn, scope)?.map_or(1, |max| max + 1),
            parent_id: None,
        },
        Placement::FirstChildOf(anchor_id) => {
            let (anchor, bounds) = resolve_anchor(conn, scope, moving, anchor_id)?;
            ResolvedPlacement {
                position: bounds.lft + 1,
                parent_id: Some(anchor.id),
            }
        }
        Placement::LastChildOf(anchor_id) => {
            let (anchor, bounds) = resolve_anchor(conn, scope, moving, anchor_id)?;
            ResolvedPlacement {
                position: bounds.rgt,
                parent_id: Some(anchor.id),
            }
        }
        Placement::Before(anchor_id) => {
            let (anchor, bounds) = resolve_anchor(conn, scope, moving, anchor_id)?;
            ResolvedPlacement {
                position: bounds.lft,
                parent_id: anchor.parent_id,
            }
        }
        Placement::After(anchor_id) => {
            let (anchor, bounds) = resolve_anchor(conn, scope, moving, anchor_id)?;
            ResolvedPlacement {
                position: bounds.rgt + 1,
                parent_id: anchor.parent_id,
            }
        }
    };
    Ok(resolved)
}

fn resolve_anchor(
    conn: &Connection,
    scope: &ScopeId,
    moving: Option<&NodeRow>,
    anchor_id: i64,
) -> Result<(NodeRow, Bounds), StoreError> {
    let anchor = require_node(conn, scope, anchor_id)?;
    let anchor_bounds = require_bounds(&anchor)?;

    if let Some(moving) = moving {
        if moving.id == anchor.id {
            return Err(StoreError::MoveIntoSelf);
        }
        if let Some(bounds) = moving.bounds() {
            if bounds.contains(&anchor_bounds) {
                return Err(StoreError::MoveIntoSelf);
            }
        }
    }

    Ok((anchor, anchor_bounds))
}

fn apply_move_tx(
    tx: &Transaction<'_>,
    scope: &ScopeId,
    plan: &MovePlan,
) -> Result<usize, StoreError> {
    Ok(tx.execute(
        "UPDATE nodes SET \
         lft = CASE \
           WHEN lft BETWEEN ?4 AND ?5 THEN lft + ?7 \
           WHEN lft BETWEEN ?2 AND ?3 THEN lft + ?6 \
           ELSE lft END, \
         rgt = CASE \
           WHEN rgt BETWEEN ?4 AND ?5 THEN rgt + ?7 \
           WHEN rgt BETWEEN ?2 AND ?3 THEN rgt + ?6 \
           ELSE rgt END \
         WHERE scope=?1 AND (lft BETWEEN ?2 AND ?3 OR rgt BETWEEN ?2 AND ?3)",
        params![
            scope.as_str(),
            plan.from,
            plan.to,
            plan.lft,
            plan.rgt,
            plan.height,
            plan.distance,
        ],
    )?)
}
