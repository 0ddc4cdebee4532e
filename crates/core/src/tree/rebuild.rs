#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use super::Bounds;

pub trait TreeNode {
    fn node_id(&self) -> i64;
    fn tree_parent_id(&self) -> Option<i64>;
    fn tree_bounds(&self) -> Option<Bounds>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundsPatch {
    pub id: i64,
    pub lft: i64,
    pub rgt: i64,
    pub parent_id: Option<i64>,
}

enum Step<T> {
    Enter { node: T, parent_id: Option<i64> },
    Leave { slot: usize },
}

fn push_group<T: TreeNode>(
    stack: &mut Vec<Step<T>>,
    group: Option<Vec<T>>,
    parent_id: Option<i64>,
) {
    let Some(group) = group else {
        return;
    };
    for node in group.into_iter().rev() {
        stack.push(Step::Enter { node, parent_id });
    }
}

// Depth-first bound assignment from parent pointers alone. Siblings keep
// their existing left-bound order, with unassigned nodes after them; each
// parent group is removed from the map as it is consumed, so a cyclic parent
// chain can never be walked twice. Groups whose parent was never reached
// (dangling ids, cycles) are promoted one at a time to the fallback parent
// until the map is empty.
//
// Returns the patches in pre-order plus the final cut, which is the `rgt` a
// surrounding subtree root would take.
pub fn assign_bounds<T: TreeNode>(
    mut nodes: Vec<T>,
    fallback_parent: Option<i64>,
    start_cut: i64,
) -> (Vec<BoundsPatch>, i64) {
    nodes.sort_by_key(|node| match node.tree_bounds() {
        Some(bounds) => (false, bounds.lft, node.node_id()),
        None => (true, 0, node.node_id()),
    });

    let mut groups: BTreeMap<Option<i64>, Vec<T>> = BTreeMap::new();
    let mut group_order: Vec<Option<i64>> = Vec::new();
    for node in nodes {
        let key = node.tree_parent_id();
        groups
            .entry(key)
            .or_insert_with(|| {
                group_order.push(key);
                Vec::new()
            })
            .push(node);
    }

    let mut out: Vec<BoundsPatch> = Vec::new();
    let mut cut = start_cut;
    let mut stack: Vec<Step<T>> = Vec::new();
    let mut pending = group_order.into_iter();

    push_group(&mut stack, groups.remove(&fallback_parent), fallback_parent);

    loop {
        while let Some(step) = stack.pop() {
            match step {
                Step::Enter { node, parent_id } => {
                    let id = node.node_id();
                    let slot = out.len();
                    out.push(BoundsPatch {
                        id,
                        lft: cut,
                        rgt: cut,
                        parent_id,
                    });
                    cut += 1;
                    stack.push(Step::Leave { slot });
                    push_group(&mut stack, groups.remove(&Some(id)), Some(id));
                }
                Step::Leave { slot } => {
                    out[slot].rgt = cut;
                    cut += 1;
                }
            }
        }

        // Remaining groups reference parents that were never reached:
        // dangling ids or cycles. Promote the earliest such group to the
        // fallback parent and keep walking until nothing is left.
        let Some(group) = pending.by_ref().find_map(|key| groups.remove(&key)) else {
            break;
        };
        push_group(&mut stack, Some(group), fallback_parent);
    }

    (out, cut)
}
