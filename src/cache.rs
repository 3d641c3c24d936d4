//! Time-windowed response cache.
//!
//! Entries are published as `Arc<V>` and never mutated; a refresh replaces
//! the entry. Every lookup classifies the entry against the policy:
//!
//! ```text
//! age < fresh_for                  → Fresh    (serve)
//! age < fresh_for + stale_for      → Stale    (serve, revalidate in background)
//! older, or invalidated            → Expired  (refetch; kept as last good)
//! ```
//!
//! Expired entries stay in the LRU until evicted so a failed refetch can
//! still serve the last good value.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

/// Freshness and capacity settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long an entry is served without revalidation.
    pub fresh_for: Duration,
    /// How long past freshness an entry is served while revalidating.
    pub stale_for: Duration,
    /// LRU capacity.
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            fresh_for: Duration::from_secs(3600),
            stale_for: Duration::from_secs(86_400),
            max_entries: 64,
        }
    }
}

impl CachePolicy {
    /// Classify an entry by age.
    pub fn classify(&self, age: Duration) -> Freshness {
        if age < self.fresh_for {
            Freshness::Fresh
        } else if age < self.fresh_for + self.stale_for {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }

    /// `Cache-Control` header value for responses built from this cache.
    pub fn cache_control(&self) -> String {
        format!(
            "public, max-age={}, stale-while-revalidate={}",
            self.fresh_for.as_secs(),
            self.stale_for.as_secs()
        )
    }
}

/// Freshness of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// Within the freshness window.
    Fresh,
    /// Past freshness, within the stale window.
    Stale,
    /// Past both windows, or invalidated.
    Expired,
}

/// A cache lookup result.
#[derive(Debug)]
pub struct CacheHit<V> {
    /// Shared cached value.
    pub value: Arc<V>,
    /// Classification at lookup time.
    pub freshness: Freshness,
    /// Time since the value was stored.
    pub age: Duration,
}

impl<V> Clone for CacheHit<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            freshness: self.freshness,
            age: self.age,
        }
    }
}

struct Entry<V> {
    value: Arc<V>,
    stored_at: Instant,
    invalidated: bool,
    refreshing: bool,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Current number of entries.
    pub len: usize,
    /// Maximum capacity.
    pub cap: usize,
    /// Lookups answered by a fresh entry.
    pub fresh_hits: u64,
    /// Lookups answered by a stale entry.
    pub stale_hits: u64,
    /// Lookups that found nothing usable without a refetch.
    pub misses: u64,
}

/// LRU cache with freshness windows and last-good retention.
pub struct ResponseCache<V> {
    policy: CachePolicy,
    entries: Mutex<LruCache<String, Entry<V>>>,
    fresh_hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> ResponseCache<V> {
    /// Create a cache with the given policy.
    pub fn new(policy: CachePolicy) -> Self {
        let cap = NonZeroUsize::new(policy.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            policy,
            entries: Mutex::new(LruCache::new(cap)),
            fresh_hits: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The active policy.
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Look up `key` now.
    pub fn lookup(&self, key: &str) -> Option<CacheHit<V>> {
        self.lookup_at(key, Instant::now())
    }

    /// Look up `key` as of `now`.
    pub fn lookup_at(&self, key: &str, now: Instant) -> Option<CacheHit<V>> {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get(key) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Cache miss");
            return None;
        };

        let age = now.saturating_duration_since(entry.stored_at);
        let freshness = if entry.invalidated {
            Freshness::Expired
        } else {
            self.policy.classify(age)
        };

        let counter = match freshness {
            Freshness::Fresh => &self.fresh_hits,
            Freshness::Stale => &self.stale_hits,
            Freshness::Expired => &self.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        debug!(key, ?freshness, age_secs = age.as_secs(), "Cache lookup");

        Some(CacheHit {
            value: Arc::clone(&entry.value),
            freshness,
            age,
        })
    }

    /// Publish a value for `key`, replacing any previous entry.
    pub fn insert(&self, key: impl Into<String>, value: Arc<V>) {
        self.insert_at(key, value, Instant::now());
    }

    /// Publish a value as stored at `stored_at`.
    pub fn insert_at(&self, key: impl Into<String>, value: Arc<V>, stored_at: Instant) {
        self.entries.lock().put(
            key.into(),
            Entry {
                value,
                stored_at,
                invalidated: false,
                refreshing: false,
            },
        );
    }

    /// Mark `key` expired. The value stays available as a last-good
    /// fallback. Returns whether the key was present.
    pub fn invalidate(&self, key: &str) -> bool {
        match self.entries.lock().peek_mut(key) {
            Some(entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        }
    }

    /// Mark every entry expired. Returns the number of entries touched.
    pub fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.lock();
        let mut touched = 0;
        for (_, entry) in entries.iter_mut() {
            entry.invalidated = true;
            touched += 1;
        }
        touched
    }

    /// Drop `key` entirely, fallback included.
    pub fn remove(&self, key: &str) -> Option<Arc<V>> {
        self.entries.lock().pop(key).map(|entry| entry.value)
    }

    /// Claim the background refresh for `key`.
    ///
    /// Returns `false` if the key is absent or a refresh is already running.
    pub fn try_begin_refresh(&self, key: &str) -> bool {
        match self.entries.lock().peek_mut(key) {
            Some(entry) if !entry.refreshing => {
                entry.refreshing = true;
                true
            }
            _ => false,
        }
    }

    /// Release a refresh claim without publishing a value.
    pub fn end_refresh(&self, key: &str) {
        if let Some(entry) = self.entries.lock().peek_mut(key) {
            entry.refreshing = false;
        }
    }

    /// Whether any entry exists for `key`, at any freshness.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains(key)
    }

    /// Current statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            len: entries.len(),
            cap: entries.cap().get(),
            fresh_hits: self.fresh_hits.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<V> std::fmt::Debug for ResponseCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("policy", &self.policy)
            .field("stats", &self.stats())
            .finish()
    }
}
