//! Upstream category sources.

pub mod memory;
pub mod registry;

#[cfg(feature = "upstream")]
pub mod http;

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{CategoryError, CategoryRecord};

/// Error type for upstream fetches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Upstream could not be reached.
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// Upstream answered with a non-success status.
    #[error("upstream returned {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Upstream payload could not be decoded.
    #[error("failed to decode upstream payload: {0}")]
    Decode(String),

    /// The fetch did not complete in time.
    #[error("upstream fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The page cap was hit before the upstream total was reached.
    #[error("upstream listing truncated after {pages} pages ({fetched} of {total:?} records)")]
    Truncated {
        /// Pages fetched.
        pages: usize,
        /// Records received before stopping.
        fetched: usize,
        /// Total reported by upstream, if any.
        total: Option<usize>,
    },
}

impl From<SourceError> for CategoryError {
    fn from(e: SourceError) -> Self {
        CategoryError::ServerError(e.to_string())
    }
}

/// Trait for category sources.
///
/// A source performs one logical fetch of the full flat record list per
/// call. Implementations do not retry; the catalog's cache policy decides
/// when to fetch again.
#[async_trait]
pub trait CategorySource: Send + Sync {
    /// Provider name used for registry lookups and logs.
    fn name(&self) -> &str;

    /// Fetch every category record.
    async fn fetch_categories(&self) -> Result<Vec<CategoryRecord>, SourceError>;
}

pub use memory::InMemoryCategorySource;
pub use registry::SourceRegistry;

#[cfg(feature = "upstream")]
pub use http::{HttpCategorySource, HttpSourceConfig};
