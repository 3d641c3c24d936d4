//! The built category index.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::{CategoryId, CategoryNode};

use super::diagnostics::BuildDiagnostics;
use super::view::{IndexView, TreeNodeView};

/// Immutable result of a graph build.
///
/// Holds every retained node once, in flat order (depth, rank, name, id),
/// with lookup maps by id and by handle. Rebuilt from scratch whenever the
/// record set changes; never mutated after construction.
#[derive(Debug, Clone)]
pub struct CategoryGraphIndex {
    nodes: Vec<CategoryNode>,
    by_id: BTreeMap<CategoryId, usize>,
    by_handle: BTreeMap<String, Vec<usize>>,
    roots: Vec<usize>,
    max_depth: u32,
    depth_limit: u32,
    diagnostics: BuildDiagnostics,
    fingerprint: String,
    built_at: DateTime<Utc>,
}

impl CategoryGraphIndex {
    pub(crate) fn assemble(
        nodes: Vec<CategoryNode>,
        roots: Vec<usize>,
        max_depth: u32,
        depth_limit: u32,
        diagnostics: BuildDiagnostics,
        fingerprint: String,
        built_at: DateTime<Utc>,
    ) -> Self {
        let mut by_id = BTreeMap::new();
        let mut by_handle: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (pos, node) in nodes.iter().enumerate() {
            by_id.insert(node.id().clone(), pos);
            by_handle.entry(node.handle().to_string()).or_default().push(pos);
        }

        Self {
            nodes,
            by_id,
            by_handle,
            roots,
            max_depth,
            depth_limit,
            diagnostics,
            fingerprint,
            built_at,
        }
    }

    /// All retained nodes in flat order.
    pub fn flat(&self) -> &[CategoryNode] {
        &self.nodes
    }

    /// Number of retained nodes.
    pub fn total(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nodes attached to the tree.
    pub fn in_tree_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_in_tree()).count()
    }

    /// Deepest depth observed among in-tree nodes.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Configured depth limit the index was built with.
    pub fn depth_limit(&self) -> u32 {
        self.depth_limit
    }

    /// Longest resolvable path, in segments.
    pub fn max_path_segments(&self) -> usize {
        self.max_depth.min(self.depth_limit) as usize + 1
    }

    /// Look up any retained node by id, in the tree or not.
    pub fn get(&self, id: &CategoryId) -> Option<&CategoryNode> {
        self.by_id.get(id).map(|&pos| &self.nodes[pos])
    }

    /// Look up a node by id, only if it is part of the tree.
    pub fn get_in_tree(&self, id: &CategoryId) -> Option<&CategoryNode> {
        self.get(id).filter(|n| n.is_in_tree())
    }

    /// Whether the id belongs to an in-tree node.
    pub fn is_in_tree(&self, id: &CategoryId) -> bool {
        self.get_in_tree(id).is_some()
    }

    /// All retained nodes carrying a handle, in flat order.
    pub fn by_handle<'a>(&'a self, handle: &str) -> impl Iterator<Item = &'a CategoryNode> + 'a {
        self.by_handle
            .get(handle)
            .into_iter()
            .flatten()
            .map(move |&pos| &self.nodes[pos])
    }

    /// Root nodes in sibling order.
    pub fn roots(&self) -> impl Iterator<Item = &CategoryNode> + '_ {
        self.roots.iter().map(move |&pos| &self.nodes[pos])
    }

    /// Direct children of a node in sibling order.
    pub fn children_of<'a>(&'a self, node: &'a CategoryNode) -> impl Iterator<Item = &'a CategoryNode> + 'a {
        node.children.iter().filter_map(move |id| self.get(id))
    }

    /// First child (or root, when `parent` is `None`) carrying `handle`.
    pub fn child_by_handle<'a>(
        &'a self,
        parent: Option<&'a CategoryNode>,
        handle: &str,
    ) -> Option<&'a CategoryNode> {
        match parent {
            Some(parent) => self.children_of(parent).find(|c| c.handle() == handle),
            None => self.roots().find(|r| r.handle() == handle),
        }
    }

    /// Ancestor nodes from root to parent.
    pub fn ancestors_of(&self, node: &CategoryNode) -> Vec<&CategoryNode> {
        node.ancestor_ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Canonical handle chain of a node, root first, derived by walking
    /// `parent_id` links.
    ///
    /// Returns `None` for nodes outside the tree.
    pub fn canonical_path<'a>(&'a self, node: &'a CategoryNode) -> Option<Vec<&'a str>> {
        if !node.is_in_tree() {
            return None;
        }
        let mut path = vec![node.handle()];
        let mut current = node;
        let mut hops = 0u32;
        while let Some(parent_id) = current.parent_id() {
            hops += 1;
            if hops > self.depth_limit {
                return None;
            }
            current = self.get_in_tree(parent_id)?;
            path.push(current.handle());
        }
        path.reverse();
        Some(path)
    }

    /// Canonical path joined with `/`.
    pub fn full_path<'a>(&'a self, node: &'a CategoryNode) -> Option<String> {
        self.canonical_path(node).map(|segments| segments.join("/"))
    }

    /// All descendants of a node, pre-order.
    pub fn descendants<'a>(&'a self, node: &'a CategoryNode) -> Vec<&'a CategoryNode> {
        let mut out = Vec::new();
        let mut stack: Vec<&'a CategoryNode> = self.children_of(node).collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut kids: Vec<&'a CategoryNode> = self.children_of(next).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Data-quality findings from the build.
    pub fn diagnostics(&self) -> &BuildDiagnostics {
        &self.diagnostics
    }

    /// Order-independent fingerprint of the record set.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// When the index was built.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Nested view of a node's subtree.
    pub fn subtree_view<'a>(&'a self, node: &'a CategoryNode) -> TreeNodeView<'a> {
        let prefix = self.full_path(node).unwrap_or_else(|| node.handle().to_string());
        self.subtree_view_at(node, prefix)
    }

    fn subtree_view_at<'a>(&'a self, node: &'a CategoryNode, full_path: String) -> TreeNodeView<'a> {
        let children = self
            .children_of(node)
            .map(|child| {
                let path = format!("{}/{}", full_path, child.handle());
                self.subtree_view_at(child, path)
            })
            .collect();

        TreeNodeView {
            record: &node.record,
            ancestor_ids: &node.ancestor_ids,
            total_product_count: node.total_product_count,
            full_path,
            children,
        }
    }

    /// Nested view of the whole tree.
    pub fn tree_view(&self) -> Vec<TreeNodeView<'_>> {
        self.roots()
            .map(|root| self.subtree_view_at(root, root.handle().to_string()))
            .collect()
    }

    /// Serializable view of the full index.
    pub fn view(&self) -> IndexView<'_> {
        let by_id: BTreeMap<&str, &CategoryNode> = self
            .by_id
            .iter()
            .map(|(id, &pos)| (id.as_str(), &self.nodes[pos]))
            .collect();
        let by_handle: BTreeMap<&str, Vec<&CategoryNode>> = self
            .by_handle
            .iter()
            .map(|(handle, positions)| {
                (handle.as_str(), positions.iter().map(|&p| &self.nodes[p]).collect::<Vec<_>>())
            })
            .collect();

        IndexView {
            tree: self.tree_view(),
            flat: &self.nodes,
            by_id,
            by_handle,
            total: self.total(),
            max_depth: self.max_depth,
            diagnostics: &self.diagnostics,
            fingerprint: &self.fingerprint,
            built_at: self.built_at,
        }
    }
}
