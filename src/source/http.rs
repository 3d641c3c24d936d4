//! Search-index backed category source.
//!
//! Pages through `GET {base_url}/indexes/{index}/documents?offset=&limit=`
//! until the reported total is reached. One call to
//! [`CategorySource::fetch_categories`] is one logical fetch; there are no
//! retries here.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::CategoryRecord;
use super::{CategorySource, SourceError};

/// Connection settings for [`HttpCategorySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSourceConfig {
    /// Search service base URL, without a trailing slash.
    pub base_url: String,
    /// Index uid holding the category documents.
    pub index: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Documents requested per page.
    pub page_size: usize,
    /// Upper bound on pages per fetch.
    pub max_pages: usize,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7700".to_string(),
            index: "categories".to_string(),
            api_key: None,
            page_size: 1000,
            max_pages: 50,
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpSourceConfig {
    /// Config pointing at `base_url` with default paging.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the index uid.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// Set the bearer token.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/indexes/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.index
        )
    }
}

#[derive(Debug, Deserialize)]
struct DocumentsPage {
    results: Vec<CategoryRecord>,
    #[serde(default)]
    total: Option<usize>,
}

/// Category source backed by a remote search index.
pub struct HttpCategorySource {
    client: Client,
    config: HttpSourceConfig,
}

impl HttpCategorySource {
    /// Create a source from configuration.
    pub fn from_config(config: HttpSourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// The active configuration.
    pub fn config(&self) -> &HttpSourceConfig {
        &self.config
    }

    async fn fetch_page(&self, offset: usize) -> Result<DocumentsPage, SourceError> {
        let mut request = self
            .client
            .get(self.config.documents_url())
            .query(&[("offset", offset), ("limit", self.config.page_size)]);

        if let Some(ref key) = self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(self.config.timeout)
            } else {
                SourceError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<DocumentsPage>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

impl fmt::Debug for HttpCategorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCategorySource")
            .field("base_url", &self.config.base_url)
            .field("index", &self.config.index)
            .field("has_api_key", &self.config.api_key.is_some())
            .field("page_size", &self.config.page_size)
            .finish()
    }
}

#[async_trait]
impl CategorySource for HttpCategorySource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_categories(&self) -> Result<Vec<CategoryRecord>, SourceError> {
        let mut records = Vec::new();
        let mut offset = 0;
        let mut total = None;

        for page_number in 0..self.config.max_pages {
            let page = self.fetch_page(offset).await?;
            let received = page.results.len();
            records.extend(page.results);
            offset += received;
            total = page.total;

            debug!(page = page_number, received, offset, "Fetched category page");

            let done = match page.total {
                Some(total) => offset >= total,
                None => received < self.config.page_size,
            };
            if done || received == 0 {
                return Ok(records);
            }
        }

        // Never hand back a partial listing
        warn!(
            max_pages = self.config.max_pages,
            fetched = records.len(),
            total = ?total,
            "Page cap reached before upstream total"
        );
        Err(SourceError::Truncated {
            pages: self.config.max_pages,
            fetched: records.len(),
            total,
        })
    }
}
