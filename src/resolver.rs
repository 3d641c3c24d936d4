//! Hierarchical slug resolution.
//!
//! A requested path addresses a node only if every segment matches the
//! node's true ancestor chain. Handles repeat across subtrees
//! (`bijoux/colliers/or` and `montres/bracelets/or`), so a leaf handle alone
//! never proves which node was meant.
//!
//! ## Contract
//!
//! 1. Empty paths are `invalid_request`; paths longer than the hierarchy
//!    are `invalid_depth`, before any lookup happens
//! 2. Segment 0 must match a root, segment *i* a child of the node matched
//!    at *i-1*
//! 3. On a full match the canonical path is recomputed from `parent_id`
//!    links and compared segment by segment
//! 4. When the walk fails, a unique in-tree node carrying the leaf handle
//!    is offered as a redirect target with `is_valid == false`; ambiguous or
//!    missing leaves are `not_found`. With redirects turned off every failed
//!    walk is `not_found`

use serde::Serialize;
use tracing::debug;

use crate::graph::CategoryGraphIndex;
use crate::types::{CategoryError, CategoryNode};

/// Split a slash-joined path into normalized segments.
///
/// Segments are trimmed and lowercased; empty segments are dropped.
pub fn split_path(path: &str) -> Vec<String> {
    normalize_segments(path.split('/'))
}

/// Normalize one handle or path segment: trimmed and lowercased.
///
/// The builder applies this to stored handles, so requested segments and
/// canonical paths always compare in the same form.
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().to_lowercase()
}

/// Normalize a sequence of segments.
pub fn normalize_segments<I, S>(segments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|s| normalize_handle(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Outcome of resolving a path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution<'a> {
    /// The resolved node.
    pub category: &'a CategoryNode,
    /// Nodes from root to parent.
    pub ancestors: Vec<&'a CategoryNode>,
    /// Whether the requested path is the node's canonical path.
    pub is_valid: bool,
    /// Canonical handle chain of the node.
    pub canonical_path: Vec<&'a str>,
    /// The normalized requested segments.
    pub requested_path: Vec<String>,
}

impl<'a> Resolution<'a> {
    /// Canonical path joined with `/`.
    pub fn canonical_full_path(&self) -> String {
        self.canonical_path.join("/")
    }

    /// Requested path joined with `/`.
    pub fn requested_full_path(&self) -> String {
        self.requested_path.join("/")
    }

    /// Turn a non-canonical resolution into an `invalid_path` error.
    pub fn into_canonical(self) -> Result<Self, CategoryError> {
        if self.is_valid {
            Ok(self)
        } else {
            Err(CategoryError::InvalidPath {
                requested: self.requested_full_path(),
                canonical: self.canonical_full_path(),
            })
        }
    }
}

/// Resolves slug paths against an index.
#[derive(Debug, Clone, Copy)]
pub struct SlugResolver<'a> {
    index: &'a CategoryGraphIndex,
    redirects: bool,
}

impl<'a> SlugResolver<'a> {
    /// Create a resolver over an index. Redirect candidates are enabled.
    pub fn new(index: &'a CategoryGraphIndex) -> Self {
        Self {
            index,
            redirects: true,
        }
    }

    /// Enable or disable the leaf-handle redirect fallback.
    pub fn with_redirects(mut self, enabled: bool) -> Self {
        self.redirects = enabled;
        self
    }

    /// Resolve a slash-joined path.
    pub fn resolve_path(&self, path: &str) -> Result<Resolution<'a>, CategoryError> {
        self.resolve(&split_path(path))
    }

    /// Resolve a sequence of segments.
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Result<Resolution<'a>, CategoryError> {
        let requested = normalize_segments(segments);
        if requested.is_empty() {
            return Err(CategoryError::InvalidRequest(
                "category path is missing or empty".to_string(),
            ));
        }

        let max = self.index.max_path_segments();
        if requested.len() > max {
            return Err(CategoryError::InvalidDepth {
                requested: requested.len(),
                max,
            });
        }

        match self.walk(&requested) {
            Some(node) => self.finish(node, requested),
            None if self.redirects => self.redirect_candidate(requested),
            None => Err(CategoryError::not_found(requested.join("/"))),
        }
    }

    /// Strict left-to-right walk through the tree.
    fn walk(&self, requested: &[String]) -> Option<&'a CategoryNode> {
        let mut current: Option<&'a CategoryNode> = None;
        for segment in requested {
            current = Some(self.index.child_by_handle(current, segment)?);
        }
        current
    }

    fn finish(
        &self,
        node: &'a CategoryNode,
        requested: Vec<String>,
    ) -> Result<Resolution<'a>, CategoryError> {
        let canonical_path = self
            .index
            .canonical_path(node)
            .ok_or_else(|| CategoryError::not_found(requested.join("/")))?;
        let is_valid = canonical_path.len() == requested.len()
            && canonical_path.iter().zip(&requested).all(|(c, r)| *c == r.as_str());

        if !is_valid {
            debug!(
                requested = %requested.join("/"),
                canonical = %canonical_path.join("/"),
                "Resolved path is not canonical"
            );
        }

        Ok(Resolution {
            category: node,
            ancestors: self.index.ancestors_of(node),
            is_valid,
            canonical_path,
            requested_path: requested,
        })
    }

    /// Best in-tree node carrying the leaf handle, scored by positional
    /// agreement with the requested path. Ties are ambiguous.
    fn redirect_candidate(&self, requested: Vec<String>) -> Result<Resolution<'a>, CategoryError> {
        let slug = requested.join("/");
        let Some(leaf) = requested.last() else {
            return Err(CategoryError::not_found(slug));
        };

        let mut best: Option<(&'a CategoryNode, usize)> = None;
        let mut tied = false;
        for candidate in self.index.by_handle(leaf).filter(|n| n.is_in_tree()) {
            let Some(path) = self.index.canonical_path(candidate) else {
                continue;
            };
            let score = path
                .iter()
                .zip(&requested)
                .filter(|(c, r)| **c == r.as_str())
                .count();
            match best {
                Some((_, top)) if score < top => {}
                Some((_, top)) if score == top => tied = true,
                _ => {
                    best = Some((candidate, score));
                    tied = false;
                }
            }
        }

        match best {
            Some((node, _)) if !tied => {
                let resolution = self.finish(node, requested)?;
                debug!(
                    requested = %slug,
                    canonical = %resolution.canonical_full_path(),
                    "Path resolved to a redirect target"
                );
                Ok(resolution)
            }
            _ => Err(CategoryError::not_found(slug)),
        }
    }
}
