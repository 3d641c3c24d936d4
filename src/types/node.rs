//! Derived category nodes.

use serde::Serialize;

use super::record::{CategoryId, CategoryRecord};

/// Where a record ended up after graph construction.
///
/// Only `InTree` nodes are reachable through the tree, the resolver and the
/// hierarchy queries. Every other placement is a data-quality finding: the
/// node stays in the flat lookup maps so it can be inspected, but it has no
/// position in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Placement {
    /// Attached to the tree.
    InTree,
    /// `parent_id` references a category that does not exist.
    Orphan {
        /// The missing parent id.
        #[serde(rename = "missingParent")]
        missing_parent: CategoryId,
    },
    /// The node sits on a parent-link cycle.
    Cyclic,
    /// The parent chain is acyclic but longer than the depth limit.
    TooDeep {
        /// Hops from the node to its root.
        hops: u32,
    },
    /// Declared depth disagrees with the number of hops to the root.
    DepthMismatch {
        /// Depth carried by the record.
        declared: u32,
        /// Depth derived from parent links.
        actual: u32,
    },
    /// The record itself is sound but an ancestor was excluded.
    Detached {
        /// The nearest excluded ancestor.
        #[serde(rename = "excludedAncestor")]
        excluded_ancestor: CategoryId,
    },
}

impl Placement {
    /// Whether the node is part of the tree.
    pub fn is_in_tree(&self) -> bool {
        matches!(self, Self::InTree)
    }
}

/// A category record plus its derived hierarchy data.
///
/// Children are held by id; the index owns every node exactly once, so no
/// node can be shared between two parents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    /// The source record.
    #[serde(flatten)]
    pub record: CategoryRecord,
    /// Direct children in sibling order (rank, then name, then id).
    pub children: Vec<CategoryId>,
    /// Ancestor ids from root to parent. Empty for roots and excluded nodes.
    pub ancestor_ids: Vec<CategoryId>,
    /// Own product count plus every descendant's.
    pub total_product_count: u64,
    /// Tree membership.
    pub placement: Placement,
}

impl CategoryNode {
    pub(crate) fn detached(record: CategoryRecord, placement: Placement) -> Self {
        let total_product_count = record.product_count;
        Self {
            record,
            children: Vec::new(),
            ancestor_ids: Vec::new(),
            total_product_count,
            placement,
        }
    }

    /// Category id.
    pub fn id(&self) -> &CategoryId {
        &self.record.id
    }

    /// URL handle.
    pub fn handle(&self) -> &str {
        &self.record.handle
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Declared depth.
    pub fn depth(&self) -> u32 {
        self.record.depth
    }

    /// Parent id, if any.
    pub fn parent_id(&self) -> Option<&CategoryId> {
        self.record.parent_id.as_ref()
    }

    /// Whether the node is part of the tree.
    pub fn is_in_tree(&self) -> bool {
        self.placement.is_in_tree()
    }

    /// Whether the node is an in-tree root.
    pub fn is_root(&self) -> bool {
        self.is_in_tree() && self.record.parent_id.is_none()
    }
}
