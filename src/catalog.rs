//! Fetch → build → cache pipeline.
//!
//! [`CatalogService`] bounds upstream latency and failure blast radius:
//!
//! - fresh entry → served as is
//! - stale entry → served, one background revalidation spawned
//! - missing or expired entry → fetched synchronously under a timeout
//! - failed fetch → last good index (any age) if one exists
//!
//! Published indexes are immutable and shared as `Arc`s; a refresh replaces
//! the cache entry rather than mutating it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheHit, CachePolicy, Freshness, ResponseCache};
use crate::graph::{BuildOptions, CategoryGraphBuilder, CategoryGraphIndex};
use crate::source::{CategorySource, SourceError};
use crate::types::CategoryError;

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOptions {
    /// Options passed to every build.
    pub build: BuildOptions,
    /// Cache windows and capacity.
    pub cache: CachePolicy,
    /// Upper bound on one upstream fetch.
    pub fetch_timeout: Duration,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            build: BuildOptions::default(),
            cache: CachePolicy::default(),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// How a served index was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Cached and within the freshness window.
    Fresh,
    /// Cached, past freshness; a background refresh was requested.
    Stale,
    /// Fetched and built for this request.
    Miss,
    /// Refetch failed; last good index served.
    Fallback,
}

impl CacheStatus {
    /// Header and log representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Fresh => "fresh",
            CacheStatus::Stale => "stale",
            CacheStatus::Miss => "miss",
            CacheStatus::Fallback => "fallback",
        }
    }
}

/// An index together with how it was obtained.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    /// Shared immutable index.
    pub index: Arc<CategoryGraphIndex>,
    /// Cache outcome.
    pub status: CacheStatus,
}

/// Cached category catalog over one source.
#[derive(Clone)]
pub struct CatalogService {
    source: Arc<dyn CategorySource>,
    cache: Arc<ResponseCache<CategoryGraphIndex>>,
    options: Arc<CatalogOptions>,
}

impl CatalogService {
    /// Create a catalog over `source`.
    pub fn new(source: Arc<dyn CategorySource>, options: CatalogOptions) -> Self {
        let cache = Arc::new(ResponseCache::new(options.cache));
        Self {
            source,
            cache,
            options: Arc::new(options),
        }
    }

    /// Name of the backing source.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Active options.
    pub fn options(&self) -> &CatalogOptions {
        &self.options
    }

    /// The underlying cache.
    pub fn cache(&self) -> &ResponseCache<CategoryGraphIndex> {
        &self.cache
    }

    /// Cache key for this catalog's index.
    pub fn cache_key(&self) -> String {
        format!("{}/categories", self.source.name())
    }

    /// Whether any index, fresh or not, is cached.
    pub fn has_cached_index(&self) -> bool {
        self.cache.contains(&self.cache_key())
    }

    /// Get the current index, applying the cache policy.
    pub async fn index(&self) -> Result<CatalogSnapshot, CategoryError> {
        let key = self.cache_key();
        let cached = self.cache.lookup(&key);

        if let Some(CacheHit { value, freshness, age }) = &cached {
            match freshness {
                Freshness::Fresh => {
                    debug!(key = %key, "Serving fresh index");
                    return Ok(CatalogSnapshot {
                        index: Arc::clone(value),
                        status: CacheStatus::Fresh,
                    });
                }
                Freshness::Stale => {
                    let spawned = self.spawn_revalidation();
                    debug!(key = %key, age_secs = age.as_secs(), spawned, "Serving stale index");
                    return Ok(CatalogSnapshot {
                        index: Arc::clone(value),
                        status: CacheStatus::Stale,
                    });
                }
                Freshness::Expired => {}
            }
        }

        match self.refresh().await {
            Ok(index) => Ok(CatalogSnapshot {
                index,
                status: CacheStatus::Miss,
            }),
            Err(err) => match cached {
                Some(hit) => {
                    warn!(
                        key = %key,
                        error = %err,
                        age_secs = hit.age.as_secs(),
                        "Refresh failed; serving last good index"
                    );
                    Ok(CatalogSnapshot {
                        index: hit.value,
                        status: CacheStatus::Fallback,
                    })
                }
                None => Err(err),
            },
        }
    }

    /// Fetch, build and publish a new index.
    ///
    /// Empty upstream results are `no_categories` and never cached.
    pub async fn refresh(&self) -> Result<Arc<CategoryGraphIndex>, CategoryError> {
        let started = Instant::now();
        let timeout = self.options.fetch_timeout;

        let records = match tokio::time::timeout(timeout, self.source.fetch_categories()).await {
            Ok(Ok(records)) => records,
            Ok(Err(err)) => {
                warn!(source = self.source.name(), error = %err, "Upstream fetch failed");
                return Err(err.into());
            }
            Err(_) => {
                let err = SourceError::Timeout(timeout);
                warn!(source = self.source.name(), error = %err, "Upstream fetch failed");
                return Err(err.into());
            }
        };

        let index = CategoryGraphBuilder::with_options(self.options.build.clone()).build(&records)?;
        let index = Arc::new(index);
        self.cache.insert(self.cache_key(), Arc::clone(&index));

        info!(
            source = self.source.name(),
            records = records.len(),
            fingerprint = index.fingerprint(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Category index refreshed"
        );
        Ok(index)
    }

    /// Spawn one background refresh if none is running.
    ///
    /// Returns whether a task was spawned. Outside a Tokio runtime nothing
    /// is spawned.
    pub fn spawn_revalidation(&self) -> bool {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return false;
        };
        let key = self.cache_key();
        if !self.cache.try_begin_refresh(&key) {
            return false;
        }

        let catalog = self.clone();
        handle.spawn(async move {
            if let Err(err) = catalog.refresh().await {
                warn!(key = %key, error = %err, "Background revalidation failed");
            }
            catalog.cache.end_refresh(&key);
        });
        true
    }

    /// Mark the cached index expired. The next request refetches, and the
    /// old index stays available as a fallback.
    pub fn invalidate(&self) -> bool {
        self.cache.invalidate(&self.cache_key())
    }

    /// Mark every cached entry expired.
    pub fn invalidate_all(&self) -> usize {
        let touched = self.cache.invalidate_all();
        info!(entries = touched, "Category cache invalidated");
        touched
    }
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("source", &self.source.name())
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish()
    }
}
