//! In-memory category source for tests and local runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::CategoryRecord;
use super::{CategorySource, SourceError};

/// In-memory category source.
///
/// Records can be swapped at runtime and failures injected, which is how
/// the catalog's stale and fallback paths are exercised.
#[derive(Debug, Default)]
pub struct InMemoryCategorySource {
    records: RwLock<Vec<CategoryRecord>>,
    failure: RwLock<Option<SourceError>>,
    fetches: AtomicUsize,
}

impl InMemoryCategorySource {
    /// Create a source serving the given records.
    pub fn new(records: Vec<CategoryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            failure: RwLock::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Replace the served records.
    pub fn replace(&self, records: Vec<CategoryRecord>) {
        *self.records.write() = records;
    }

    /// Make every subsequent fetch fail with `error`, or succeed again with `None`.
    pub fn set_failure(&self, error: Option<SourceError>) {
        *self.failure.write() = error;
    }

    /// Number of fetches performed so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CategorySource for InMemoryCategorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_categories(&self) -> Result<Vec<CategoryRecord>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.read().clone() {
            return Err(error);
        }
        Ok(self.records.read().clone())
    }
}
