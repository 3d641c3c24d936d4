//! Service configuration from the environment.
//!
//! Every variable has a default. A value that fails to parse is logged and
//! replaced by its default rather than aborting startup.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::CachePolicy;
use crate::catalog::CatalogOptions;
use crate::features::FeatureSet;
use crate::graph::BuildOptions;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

/// Runtime configuration of the category service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Name of the registered source to serve from.
    pub source: String,
    /// Search service base URL.
    pub upstream_url: String,
    /// Index uid holding category documents.
    pub upstream_index: String,
    /// Optional bearer token for the search service.
    pub upstream_api_key: Option<String>,
    /// Documents per page.
    pub upstream_page_size: usize,
    /// Page cap per fetch.
    pub upstream_max_pages: usize,
    /// Timeout for one fetch.
    pub upstream_timeout: Duration,
    /// Cache windows and capacity.
    pub cache: CachePolicy,
    /// Drop inactive records before building.
    pub active_only: bool,
    /// HMAC key for the revalidation webhook.
    pub revalidate_secret: Option<String>,
    /// Enabled optional endpoints.
    pub features: FeatureSet,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            source: "http".to_string(),
            upstream_url: "http://localhost:7700".to_string(),
            upstream_index: "categories".to_string(),
            upstream_api_key: None,
            upstream_page_size: 1000,
            upstream_max_pages: 50,
            upstream_timeout: Duration::from_secs(10),
            cache: CachePolicy::default(),
            active_only: true,
            revalidate_secret: None,
            features: FeatureSet::all(),
            log_format: LogFormat::Json,
        }
    }
}

impl ServiceConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let cache = CachePolicy {
            fresh_for: Duration::from_secs(parsed(&lookup, "CACHE_MAX_AGE_SECS", defaults.cache.fresh_for.as_secs())),
            stale_for: Duration::from_secs(parsed(&lookup, "CACHE_STALE_SECS", defaults.cache.stale_for.as_secs())),
            max_entries: parsed(&lookup, "CACHE_MAX_ENTRIES", defaults.cache.max_entries),
        };

        let log_format = match text("LOG_FORMAT").as_deref() {
            Some("pretty") => LogFormat::Pretty,
            Some("json") | None => LogFormat::Json,
            Some(other) => {
                warn!(value = other, "Unknown LOG_FORMAT, using json");
                LogFormat::Json
            }
        };

        Self {
            host: text("HOST").unwrap_or(defaults.host),
            port: parsed(&lookup, "PORT", defaults.port),
            source: text("CATEGORY_SOURCE").unwrap_or(defaults.source),
            upstream_url: text("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            upstream_index: text("UPSTREAM_INDEX").unwrap_or(defaults.upstream_index),
            upstream_api_key: text("UPSTREAM_API_KEY"),
            upstream_page_size: parsed(&lookup, "UPSTREAM_PAGE_SIZE", defaults.upstream_page_size),
            upstream_max_pages: parsed(&lookup, "UPSTREAM_MAX_PAGES", defaults.upstream_max_pages),
            upstream_timeout: Duration::from_secs(parsed(
                &lookup,
                "UPSTREAM_TIMEOUT_SECS",
                defaults.upstream_timeout.as_secs(),
            )),
            cache,
            active_only: parsed(&lookup, "ACTIVE_ONLY", defaults.active_only),
            revalidate_secret: text("REVALIDATE_SECRET"),
            features: text("FEATURES")
                .map(|list| FeatureSet::parse(&list))
                .unwrap_or(defaults.features),
            log_format,
        }
    }

    /// `host:port` listen address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Catalog pipeline options.
    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            build: BuildOptions {
                active_only: self.active_only,
                ..BuildOptions::default()
            },
            cache: self.cache,
            fetch_timeout: self.upstream_timeout,
        }
    }

    /// Connection settings for the search-index source.
    #[cfg(feature = "upstream")]
    pub fn http_source_config(&self) -> crate::source::HttpSourceConfig {
        crate::source::HttpSourceConfig {
            base_url: self.upstream_url.clone(),
            index: self.upstream_index.clone(),
            api_key: self.upstream_api_key.clone(),
            page_size: self.upstream_page_size.max(1),
            max_pages: self.upstream_max_pages.max(1),
            timeout: self.upstream_timeout,
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, ?default, "Invalid config value, using default");
                default
            }
        },
        _ => default,
    }
}
