//! Hierarchy queries over a built index.
//!
//! All queries are pure lookups on precomputed data. Product totals come
//! from the build's post-order pass and are never recomputed per call.
//!
//! Queries only answer for nodes that hold a tree position. A node that is
//! missing from the index, or retained only for diagnostics (orphan, cyclic,
//! detached), yields `not_found`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::graph::{BuildDiagnostics, CategoryGraphIndex, TreeNodeView};
use crate::resolver::Resolution;
use crate::types::{CategoryError, CategoryId, CategoryNode};

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breadcrumb {
    /// Category id.
    pub id: CategoryId,
    /// Display label.
    pub label: String,
    /// Handle of this entry.
    pub handle: String,
    /// Slash-joined handle chain up to and including this entry.
    pub path: String,
}

/// Metadata attached to a page response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta<'a> {
    /// Fingerprint of the record set the index was built from.
    pub fingerprint: String,
    /// When the underlying index was built.
    pub generated_at: DateTime<Utc>,
    /// Retained node count.
    pub total: usize,
    /// Deepest in-tree depth.
    pub max_depth: u32,
    /// Whether the requested path was canonical.
    pub is_canonical: bool,
    /// Records the build excluded or flagged.
    pub diagnostics: &'a BuildDiagnostics,
    /// Cache outcome, filled in by the serving layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_status: Option<String>,
}

/// Everything a category page needs, in one response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPageView<'a> {
    /// The resolved category.
    pub category: &'a CategoryNode,
    /// Root-to-node breadcrumbs.
    pub breadcrumbs: Vec<Breadcrumb>,
    /// Nodes from root to parent.
    pub ancestors: Vec<&'a CategoryNode>,
    /// Direct children.
    pub children: Vec<&'a CategoryNode>,
    /// Other children of the same parent.
    pub siblings: Vec<&'a CategoryNode>,
    /// Immediate parent.
    pub parent: Option<&'a CategoryNode>,
    /// Own plus descendant product count.
    pub total_product_count: u64,
    /// Canonical slash-joined path.
    pub full_path: String,
    /// Depth of the category (root = 0).
    pub depth: u32,
    /// The category's subtree, nested.
    pub tree: TreeNodeView<'a>,
    /// Response metadata.
    pub meta: PageMeta<'a>,
}

/// Query facade over an index.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyQueries<'a> {
    index: &'a CategoryGraphIndex,
}

impl<'a> HierarchyQueries<'a> {
    /// Create a query facade.
    pub fn new(index: &'a CategoryGraphIndex) -> Self {
        Self { index }
    }

    fn node(&self, id: &CategoryId) -> Result<&'a CategoryNode, CategoryError> {
        self.index
            .get_in_tree(id)
            .ok_or_else(|| CategoryError::not_found(id.as_str()))
    }

    /// Root-to-node breadcrumbs, the node included.
    pub fn breadcrumbs(&self, id: &CategoryId) -> Result<Vec<Breadcrumb>, CategoryError> {
        let node = self.node(id)?;
        let mut chain = self.index.ancestors_of(node);
        chain.push(node);

        let mut path = String::new();
        Ok(chain
            .into_iter()
            .map(|n| {
                if !path.is_empty() {
                    path.push('/');
                }
                path.push_str(n.handle());
                Breadcrumb {
                    id: n.id().clone(),
                    label: n.name().to_string(),
                    handle: n.handle().to_string(),
                    path: path.clone(),
                }
            })
            .collect())
    }

    /// Direct children in sibling order.
    pub fn children(&self, id: &CategoryId) -> Result<Vec<&'a CategoryNode>, CategoryError> {
        let node = self.node(id)?;
        Ok(self.index.children_of(node).collect())
    }

    /// Nodes sharing the parent, the node itself excluded. Roots are
    /// siblings of each other.
    pub fn siblings(&self, id: &CategoryId) -> Result<Vec<&'a CategoryNode>, CategoryError> {
        let node = self.node(id)?;
        let peers: Vec<&'a CategoryNode> = match self.parent(id)? {
            Some(parent) => self.index.children_of(parent).collect(),
            None => self.index.roots().collect(),
        };
        Ok(peers.into_iter().filter(|n| n.id() != node.id()).collect())
    }

    /// Immediate parent, `None` for roots.
    pub fn parent(&self, id: &CategoryId) -> Result<Option<&'a CategoryNode>, CategoryError> {
        let node = self.node(id)?;
        Ok(node.parent_id().and_then(|p| self.index.get_in_tree(p)))
    }

    /// Ancestors from root to parent.
    pub fn ancestors(&self, id: &CategoryId) -> Result<Vec<&'a CategoryNode>, CategoryError> {
        let node = self.node(id)?;
        Ok(self.index.ancestors_of(node))
    }

    /// Own plus descendant product count.
    pub fn total_product_count(&self, id: &CategoryId) -> Result<u64, CategoryError> {
        Ok(self.node(id)?.total_product_count)
    }

    /// Canonical slash-joined path.
    pub fn full_path(&self, id: &CategoryId) -> Result<String, CategoryError> {
        let node = self.node(id)?;
        self.index
            .full_path(node)
            .ok_or_else(|| CategoryError::not_found(id.as_str()))
    }

    /// Assemble the page aggregate for a resolution.
    pub fn page(&self, resolution: &Resolution<'a>) -> Result<CategoryPageView<'a>, CategoryError> {
        let node = resolution.category;
        let id = node.id();

        Ok(CategoryPageView {
            category: node,
            breadcrumbs: self.breadcrumbs(id)?,
            ancestors: self.ancestors(id)?,
            children: self.children(id)?,
            siblings: self.siblings(id)?,
            parent: self.parent(id)?,
            total_product_count: node.total_product_count,
            full_path: self.full_path(id)?,
            depth: node.depth(),
            tree: self.index.subtree_view(node),
            meta: PageMeta {
                fingerprint: self.index.fingerprint().to_string(),
                generated_at: self.index.built_at(),
                total: self.index.total(),
                max_depth: self.index.max_depth(),
                is_canonical: resolution.is_valid,
                diagnostics: self.index.diagnostics(),
                cache_status: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CategoryGraphBuilder;
    use crate::resolver::SlugResolver;
    use crate::types::CategoryRecord;

    fn index() -> CategoryGraphIndex {
        CategoryGraphBuilder::new()
            .build(&[
                CategoryRecord::root("bijoux", "Bijoux", "bijoux", 0, 0),
                CategoryRecord::root("montres", "Montres", "montres", 1, 2),
                CategoryRecord::child("colliers", "bijoux", "Colliers", "colliers", 1, 0, 0),
                CategoryRecord::child("bagues", "bijoux", "Bagues", "bagues", 1, 1, 5),
                CategoryRecord::child("or", "colliers", "Or", "or", 2, 0, 15),
                CategoryRecord::child("argent", "colliers", "Argent", "argent", 2, 1, 15),
                CategoryRecord::child("ghost-child", "ghost", "Ghost", "ghost", 1, 0, 1),
            ])
            .unwrap()
    }

    #[test]
    fn test_breadcrumbs_paths() {
        let index = index();
        let crumbs = HierarchyQueries::new(&index).breadcrumbs(&"or".into()).unwrap();

        let paths: Vec<&str> = crumbs.iter().map(|b| b.path.as_str()).collect();
        assert_eq!(paths, vec!["bijoux", "bijoux/colliers", "bijoux/colliers/or"]);
        assert_eq!(crumbs[0].label, "Bijoux");
    }

    #[test]
    fn test_siblings_exclude_self() {
        let index = index();
        let queries = HierarchyQueries::new(&index);

        let siblings = queries.siblings(&"or".into()).unwrap();
        assert_eq!(siblings.len(), 1);
        assert_eq!(siblings[0].id().as_str(), "argent");

        let root_siblings = queries.siblings(&"bijoux".into()).unwrap();
        assert_eq!(root_siblings.len(), 1);
        assert_eq!(root_siblings[0].id().as_str(), "montres");
    }

    #[test]
    fn test_lone_root_has_no_siblings() {
        let index = CategoryGraphBuilder::new()
            .build(&[CategoryRecord::root("solo", "Solo", "solo", 0, 0)])
            .unwrap();
        assert!(HierarchyQueries::new(&index).siblings(&"solo".into()).unwrap().is_empty());
    }

    #[test]
    fn test_parent_and_children() {
        let index = index();
        let queries = HierarchyQueries::new(&index);

        assert!(queries.parent(&"bijoux".into()).unwrap().is_none());
        assert_eq!(queries.parent(&"or".into()).unwrap().unwrap().id().as_str(), "colliers");

        let children: Vec<&str> = queries
            .children(&"bijoux".into())
            .unwrap()
            .iter()
            .map(|n| n.id().as_str())
            .collect();
        assert_eq!(children, vec!["colliers", "bagues"]);
    }

    #[test]
    fn test_total_product_count_is_precomputed() {
        let index = index();
        let queries = HierarchyQueries::new(&index);
        assert_eq!(queries.total_product_count(&"colliers".into()).unwrap(), 30);
        assert_eq!(queries.total_product_count(&"bijoux".into()).unwrap(), 35);
        assert_eq!(queries.total_product_count(&"montres".into()).unwrap(), 2);
    }

    #[test]
    fn test_unknown_and_detached_are_not_found() {
        let index = index();
        let queries = HierarchyQueries::new(&index);

        let err = queries.children(&"missing".into()).unwrap_err();
        assert_eq!(err, CategoryError::not_found("missing"));

        // Retained for lookup, but has no tree position.
        assert!(index.get(&"ghost-child".into()).is_some());
        assert!(matches!(
            queries.breadcrumbs(&"ghost-child".into()),
            Err(CategoryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_page_aggregate() {
        let index = index();
        let resolution = SlugResolver::new(&index).resolve_path("bijoux/colliers").unwrap();
        let page = HierarchyQueries::new(&index).page(&resolution).unwrap();

        assert_eq!(page.full_path, "bijoux/colliers");
        assert_eq!(page.total_product_count, 30);
        assert_eq!(page.depth, 1);
        assert_eq!(page.children.len(), 2);
        assert_eq!(page.siblings.len(), 1);
        assert_eq!(page.parent.unwrap().id().as_str(), "bijoux");
        assert!(page.meta.is_canonical);

        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["fullPath"], "bijoux/colliers");
        assert_eq!(value["tree"]["children"][1]["fullPath"], "bijoux/colliers/argent");
        assert_eq!(value["breadcrumbs"][1]["path"], "bijoux/colliers");
        assert!(value["meta"].get("cacheStatus").is_none());
    }
}
