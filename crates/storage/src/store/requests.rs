#![forbid(unsafe_code)]

use ns_core::tree::{Bounds, Placement, TreeNode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq)]
pub struct NodeRow {
    pub id: i64,
    pub scope: String,
    pub parent_id: Option<i64>,
    pub lft: Option<i64>,
    pub rgt: Option<i64>,
    pub payload: serde_json::Value,
    pub deleted_at_ms: Option<i64>,
}

impl NodeRow {
    pub fn bounds(&self) -> Option<Bounds> {
        match (self.lft, self.rgt) {
            (Some(lft), Some(rgt)) => Some(Bounds::new(lft, rgt)),
            _ => None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.bounds().is_some_and(|bounds| bounds.is_leaf())
    }

    pub fn has_children(&self) -> bool {
        self.bounds()
            .is_some_and(|bounds| bounds.rgt > bounds.lft + 1)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at_ms.is_some()
    }
}

impl TreeNode for NodeRow {
    fn node_id(&self) -> i64 {
        self.id
    }

    fn tree_parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn tree_bounds(&self) -> Option<Bounds> {
        self.bounds()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeWithDepth {
    pub node: NodeRow,
    pub depth: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateNodeRequest {
    pub payload: serde_json::Value,
    pub placement: Placement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveMode {
    Hard,
    Soft { deleted_at_ms: i64 },
}

// One entry of the external hierarchy fed to rebuild_tree. Entries without an
// id become new nodes; entries with an id must match an existing node.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NodeSpec {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default = "empty_payload")]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub children: Vec<NodeSpec>,
}

fn empty_payload() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ErrorCounts {
    pub oddness: i64,
    pub duplicates: i64,
    pub wrong_parent: i64,
    pub missing_parent: i64,
}

impl ErrorCounts {
    pub fn total(&self) -> i64 {
        self.oddness + self.duplicates + self.wrong_parent + self.missing_parent
    }

    pub fn is_broken(&self) -> bool {
        self.total() > 0
    }
}
