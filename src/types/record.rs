//! Category records as delivered by the upstream search index.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a category.
///
/// Upstream ids are opaque strings (`pcat_01H...`). The newtype implements
/// `Ord` so every map keyed by id iterates deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Create a new CategoryId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CategoryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

fn default_active() -> bool {
    true
}

/// A flat category record.
///
/// Accepts both the upstream snake_case shape (`parent_category_id`,
/// `product_count`, `is_active`) and the camelCase shape this crate emits.
/// Ancestor/path convenience fields sent by the index are ignored; the graph
/// recomputes them from `parent_id` links.
///
/// Field order matters: the derived `Ord` sorts by `id` first, which the
/// builder relies on for duplicate elimination.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    /// Unique category id.
    pub id: CategoryId,
    /// Display name.
    pub name: String,
    /// URL slug segment, unique among siblings only.
    pub handle: String,
    /// Parent id, `None` for roots.
    #[serde(default, alias = "parent_category_id", alias = "parent_id")]
    pub parent_id: Option<CategoryId>,
    /// Declared depth (root = 0). Checked against the parent chain.
    #[serde(default)]
    pub depth: u32,
    /// Sibling ordering key.
    #[serde(default)]
    pub rank: i64,
    /// Whether the category is published.
    #[serde(default = "default_active", alias = "is_active")]
    pub is_active: bool,
    /// Products assigned directly to this category (descendants excluded).
    #[serde(default, alias = "product_count")]
    pub product_count: u64,
    /// Optional long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CategoryRecord {
    /// Create an active record without a description.
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        handle: impl Into<String>,
        parent_id: Option<CategoryId>,
        depth: u32,
        rank: i64,
        product_count: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            handle: handle.into(),
            parent_id,
            depth,
            rank,
            is_active: true,
            product_count,
            description: None,
        }
    }

    /// Shorthand for a root record.
    pub fn root(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        handle: impl Into<String>,
        rank: i64,
        product_count: u64,
    ) -> Self {
        Self::new(id, name, handle, None, 0, rank, product_count)
    }

    /// Shorthand for a child record.
    pub fn child(
        id: impl Into<CategoryId>,
        parent_id: impl Into<CategoryId>,
        name: impl Into<String>,
        handle: impl Into<String>,
        depth: u32,
        rank: i64,
        product_count: u64,
    ) -> Self {
        Self::new(id, name, handle, Some(parent_id.into()), depth, rank, product_count)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the active flag.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Whether this record declares itself a root.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
