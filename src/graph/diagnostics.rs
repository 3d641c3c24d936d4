//! Data-quality findings collected while building a graph.

use serde::Serialize;

use crate::types::CategoryId;

/// Two or more siblings sharing a handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleCollision {
    /// Shared parent, `None` for roots.
    pub parent_id: Option<CategoryId>,
    /// The colliding handle.
    pub handle: String,
    /// Colliding ids in sibling order. The first one wins resolution.
    pub ids: Vec<CategoryId>,
}

/// Everything the builder excluded or flagged, by id.
///
/// Lists are sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDiagnostics {
    /// Ids that appeared more than once; only one record was kept.
    pub duplicate_ids: Vec<CategoryId>,
    /// Records whose parent does not exist.
    pub orphans: Vec<CategoryId>,
    /// Records on a parent-link cycle.
    pub cyclic: Vec<CategoryId>,
    /// Records deeper than the depth limit.
    pub too_deep: Vec<CategoryId>,
    /// Records whose declared depth disagrees with their parent chain.
    pub depth_mismatches: Vec<CategoryId>,
    /// Sound records below an excluded ancestor.
    pub detached: Vec<CategoryId>,
    /// Sibling handle collisions among in-tree nodes.
    pub duplicate_sibling_handles: Vec<HandleCollision>,
    /// Inactive records dropped before building.
    pub inactive_skipped: usize,
}

impl BuildDiagnostics {
    /// Whether the build found nothing to report.
    pub fn is_clean(&self) -> bool {
        self.duplicate_ids.is_empty()
            && self.excluded_count() == 0
            && self.duplicate_sibling_handles.is_empty()
    }

    /// Number of retained records with no tree position.
    pub fn excluded_count(&self) -> usize {
        self.orphans.len()
            + self.cyclic.len()
            + self.too_deep.len()
            + self.depth_mismatches.len()
            + self.detached.len()
    }
}
