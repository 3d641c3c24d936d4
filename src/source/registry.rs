//! Registry of category providers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::CategorySource;

/// Category providers keyed by name.
///
/// Built once at startup and handed to the service state; nothing looks
/// providers up through global state.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn CategorySource>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own name.
    ///
    /// Returns the previously registered source with that name, if any.
    pub fn register(&mut self, source: Arc<dyn CategorySource>) -> Option<Arc<dyn CategorySource>> {
        self.sources.insert(source.name().to_string(), source)
    }

    /// Register a source under an explicit name.
    pub fn register_as(
        &mut self,
        name: impl Into<String>,
        source: Arc<dyn CategorySource>,
    ) -> Option<Arc<dyn CategorySource>> {
        self.sources.insert(name.into(), source)
    }

    /// Look up a source by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn CategorySource>> {
        self.sources.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    /// Number of registered sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}
