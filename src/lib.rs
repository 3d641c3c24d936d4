//! # category-graph
//!
//! Hierarchical category resolution and aggregation for storefront
//! category pages.
//!
//! The crate answers one question:
//!
//! > Given a slug path like `bijoux/colliers/or`, which category does it
//! > address, and is that its true location in the hierarchy?
//!
//! ## Core Contract
//!
//! 1. Build a deterministic tree from a flat, possibly dirty record list
//! 2. Resolve slug paths strictly against each node's ancestor chain
//! 3. Answer hierarchy queries (breadcrumbs, siblings, descendant totals)
//!    from precomputed data
//!
//! ## Architecture
//!
//! ```text
//! CategorySource → CategoryGraphBuilder → CategoryGraphIndex → SlugResolver → HierarchyQueries
//!       ↑                                        ↓
//!  SourceRegistry                    ResponseCache (CatalogService)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same record set, in any input order → identical tree, flat list and fingerprint
//! - Sibling ordering is canonical (rank, name, id)
//! - Data-quality findings never abort a build; they are reported in
//!   [`BuildDiagnostics`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod graph;
pub mod resolver;
pub mod queries;
pub mod canonical;
pub mod source;
pub mod cache;
pub mod catalog;
pub mod features;
pub mod config;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{CategoryError, CategoryId, CategoryNode, CategoryRecord, ErrorKind, Placement};
pub use graph::{
    BuildDiagnostics, BuildOptions, CategoryGraphBuilder, CategoryGraphIndex, HandleCollision,
    IndexView, TreeNodeView,
};
pub use resolver::{normalize_handle, normalize_segments, split_path, Resolution, SlugResolver};
pub use queries::{Breadcrumb, CategoryPageView, HierarchyQueries, PageMeta};
pub use canonical::{canonical_hash, canonical_hash_hex, records_fingerprint, to_canonical_bytes};
pub use source::{CategorySource, InMemoryCategorySource, SourceError, SourceRegistry};
#[cfg(feature = "upstream")]
pub use source::{HttpCategorySource, HttpSourceConfig};
pub use cache::{CacheHit, CachePolicy, CacheStats, Freshness, ResponseCache};
pub use catalog::{CacheStatus, CatalogOptions, CatalogService, CatalogSnapshot};
pub use features::{FeatureKey, FeatureSet};
pub use config::ServiceConfig;

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState};

/// Deepest allowed depth (root = 0). Paths may hold at most this many
/// segments plus one.
pub const MAX_CATEGORY_DEPTH: u32 = 4;

/// Schema version for serialized index and page views.
/// Increment on breaking changes to any view type.
pub const CATEGORY_GRAPH_SCHEMA_VERSION: &str = "1.0.0";
