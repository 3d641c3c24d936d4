//! Borrowed JSON views over an index.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{CategoryId, CategoryNode, CategoryRecord};

use super::diagnostics::BuildDiagnostics;

/// A node with its children nested, for tree rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNodeView<'a> {
    /// The source record.
    #[serde(flatten)]
    pub record: &'a CategoryRecord,
    /// Ancestor ids from root to parent.
    pub ancestor_ids: &'a [CategoryId],
    /// Aggregated product count.
    pub total_product_count: u64,
    /// Slash-joined canonical path.
    pub full_path: String,
    /// Nested children in sibling order.
    pub children: Vec<TreeNodeView<'a>>,
}

/// The full index as served by `GET /api/categories`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexView<'a> {
    /// Root nodes with nested children.
    pub tree: Vec<TreeNodeView<'a>>,
    /// Every retained node in flat order.
    pub flat: &'a [CategoryNode],
    /// Nodes keyed by id.
    pub by_id: BTreeMap<&'a str, &'a CategoryNode>,
    /// Nodes grouped by handle.
    pub by_handle: BTreeMap<&'a str, Vec<&'a CategoryNode>>,
    /// Number of retained nodes.
    pub total: usize,
    /// Deepest in-tree depth.
    pub max_depth: u32,
    /// Build findings.
    pub diagnostics: &'a BuildDiagnostics,
    /// Record-set fingerprint.
    pub fingerprint: &'a str,
    /// Build timestamp.
    pub built_at: DateTime<Utc>,
}
