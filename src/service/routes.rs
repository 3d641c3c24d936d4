//! Axum routes for the category service.

use axum::{
    body::Bytes,
    extract::{Json, Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::CacheStats;
use crate::catalog::CatalogSnapshot;
use crate::features::{FeatureKey, FeatureSet};
use crate::queries::HierarchyQueries;
use crate::resolver::SlugResolver;
use crate::types::{CategoryError, ErrorKind};
use crate::CATEGORY_GRAPH_SCHEMA_VERSION;

use super::middleware::{metrics_middleware, record_resolution, record_revalidation};
use super::state::ServiceState;

/// Prefix of category page URLs; `Location` headers point below it.
pub const CATEGORIES_PATH: &str = "/api/categories";

/// Header carrying the cache outcome.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Header carrying the webhook signature.
pub const X_SIGNATURE: &str = "x-signature";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Structured error response with correlation ID for tracing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Machine-readable error kind.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Requested slug, when the error concerns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    /// Canonical path to redirect to (`invalid_path` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_path: Option<String>,
    /// Correlation ID for request tracing (matches X-Cloud-Trace-Context).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// An error ready to be rendered as an HTTP response.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                message: message.into(),
                slug: None,
                canonical_path: None,
                correlation_id: None,
            },
        }
    }

    /// 404 for an endpoint switched off by the feature set.
    pub fn disabled(feature: FeatureKey) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound.as_str(),
            format!("feature '{}' is disabled", feature),
        )
    }

    /// 401 for a bad webhook signature.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    /// Attach a correlation id.
    pub fn with_correlation_id(mut self, id: Option<String>) -> Self {
        self.body.correlation_id = id;
        self
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CategoryError> for ApiError {
    fn from(err: CategoryError) -> Self {
        let kind = err.kind();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut api = Self::new(status, kind.as_str(), err.to_string());
        api.body.slug = err.slug().map(str::to_string);
        if let CategoryError::InvalidPath { canonical, .. } = &err {
            api.body.canonical_path = Some(canonical.clone());
        }
        api
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                error = %self.body.error,
                message = %self.body.message,
                correlation_id = ?self.body.correlation_id,
                "Request failed"
            );
        } else {
            tracing::debug!(
                error = %self.body.error,
                slug = ?self.body.slug,
                correlation_id = ?self.body.correlation_id,
                "Request rejected"
            );
        }

        let mut headers = HeaderMap::new();
        if let Some(canonical) = &self.body.canonical_path {
            if let Ok(location) = HeaderValue::from_str(&category_url(canonical)) {
                headers.insert(header::LOCATION, location);
            }
        }
        (self.status, headers, Json(self.body)).into_response()
    }
}

/// Revalidation webhook response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevalidateResponse {
    /// Always `true` on success.
    pub revalidated: bool,
    /// Cache entries marked expired.
    pub entries: usize,
    /// Server time of the invalidation.
    pub now: DateTime<Utc>,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` once an index is cached, `degraded` before.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// View schema version.
    pub schema_version: String,
    /// Active source name.
    pub source: String,
    /// Registered source names.
    pub sources: Vec<String>,
    /// Enabled features.
    pub features: FeatureSet,
    /// Response cache statistics.
    pub cache: CacheStats,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always `alive`.
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether traffic can be served.
    pub ready: bool,
    /// Failure detail, if any.
    pub details: Option<String>,
}

// ============================================================================
// Helpers
// ============================================================================

/// Public URL of a category path.
pub fn category_url(path: &str) -> String {
    format!("{}/{}", CATEGORIES_PATH, path)
}

fn correlation_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Cloud-Trace-Context")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split('/').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn etag(fingerprint: &str) -> String {
    format!("\"{}\"", fingerprint)
}

fn cache_headers(state: &ServiceState, snapshot: &CatalogSnapshot) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let policy = state.catalog.options().cache;
    if let Ok(value) = HeaderValue::from_str(&policy.cache_control()) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&etag(snapshot.index.fingerprint())) {
        headers.insert(header::ETAG, value);
    }
    headers.insert(X_CACHE, HeaderValue::from_static(snapshot.status.as_str()));
    headers
}

fn not_modified(request: &HeaderMap, fingerprint: &str) -> bool {
    let expected = etag(fingerprint);
    request
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|tag| {
            let tag = tag.trim();
            tag == "*" || tag == expected || tag.strip_prefix("W/") == Some(expected.as_str())
        }))
        .unwrap_or(false)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Full index: tree, flat list and lookup maps.
async fn index_handler(State(state): State<Arc<ServiceState>>, headers: HeaderMap) -> Response {
    if !state.features.enabled(FeatureKey::Tree) {
        return ApiError::disabled(FeatureKey::Tree).into_response();
    }

    let snapshot = match state.catalog.index().await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            return ApiError::from(err)
                .with_correlation_id(correlation_id(&headers))
                .into_response()
        }
    };

    let response_headers = cache_headers(&state, &snapshot);
    if not_modified(&headers, snapshot.index.fingerprint()) {
        return (StatusCode::NOT_MODIFIED, response_headers).into_response();
    }
    (response_headers, Json(snapshot.index.view())).into_response()
}

/// Category page aggregate for a slug path.
async fn page_handler(
    State(state): State<Arc<ServiceState>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    match render_page(&state, &path, &headers).await {
        Ok(response) => response,
        Err(err) => ApiError::from(err)
            .with_correlation_id(correlation_id(&headers))
            .into_response(),
    }
}

async fn render_page(
    state: &ServiceState,
    path: &str,
    headers: &HeaderMap,
) -> Result<Response, CategoryError> {
    let snapshot = state.catalog.index().await?;
    let index = snapshot.index.as_ref();
    let cache_status = snapshot.status.as_str();

    let resolver =
        SlugResolver::new(index).with_redirects(state.features.enabled(FeatureKey::Redirects));
    let resolution = match resolver.resolve_path(path) {
        Ok(resolution) => resolution,
        Err(err) => {
            record_resolution(err.kind().as_str(), path.split('/').count(), cache_status);
            return Err(err);
        }
    };
    let segments = resolution.requested_path.len();
    let resolution = match resolution.into_canonical() {
        Ok(resolution) => resolution,
        Err(err) => {
            record_resolution(err.kind().as_str(), segments, cache_status);
            return Err(err);
        }
    };
    record_resolution("ok", segments, cache_status);

    let response_headers = cache_headers(state, &snapshot);
    if not_modified(headers, index.fingerprint()) {
        return Ok((StatusCode::NOT_MODIFIED, response_headers).into_response());
    }

    let mut page = HierarchyQueries::new(index).page(&resolution)?;
    page.meta.cache_status = Some(cache_status.to_string());
    Ok((response_headers, Json(page)).into_response())
}

/// Existence check without a body: 200 for canonical paths, 404 otherwise.
async fn head_handler(State(state): State<Arc<ServiceState>>, Path(path): Path<String>) -> Response {
    if !state.features.enabled(FeatureKey::HeadValidation) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let snapshot = match state.catalog.index().await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            let status = StatusCode::from_u16(err.kind().status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return status.into_response();
        }
    };

    match SlugResolver::new(&snapshot.index).resolve_path(&path) {
        Ok(resolution) if resolution.is_valid => {
            (StatusCode::OK, cache_headers(&state, &snapshot)).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Signed webhook that expires every cached index.
async fn revalidate_handler(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.revalidation_enabled() {
        return ApiError::disabled(FeatureKey::Revalidate).into_response();
    }

    let signature = headers
        .get(X_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_start_matches("sha256="))
        .unwrap_or_default();

    if !state.verify_signature(&body, signature) {
        record_revalidation(false, 0);
        return ApiError::unauthorized("invalid or missing signature")
            .with_correlation_id(correlation_id(&headers))
            .into_response();
    }

    let entries = state.catalog.invalidate_all();
    record_revalidation(true, entries);
    Json(RevalidateResponse {
        revalidated: true,
        entries,
        now: Utc::now(),
    })
    .into_response()
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<Arc<ServiceState>>) -> Json<HealthResponse> {
    let healthy = state.catalog.has_cached_index();
    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: CATEGORY_GRAPH_SCHEMA_VERSION.to_string(),
        source: state.catalog.source_name().to_string(),
        sources: state.sources.names().into_iter().map(str::to_string).collect(),
        features: state.features.clone(),
        cache: state.catalog.cache().stats(),
    })
}

/// Liveness check endpoint.
///
/// Returns 200 if the process is alive. Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness check endpoint.
///
/// Ready once an index is cached or the source answers; 503 otherwise.
async fn readiness_handler(
    State(state): State<Arc<ServiceState>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.catalog.has_cached_index() {
        return Ok(Json(ReadinessResponse {
            ready: true,
            details: None,
        }));
    }

    match state.catalog.index().await {
        Ok(snapshot) => Ok(Json(ReadinessResponse {
            ready: true,
            details: Some(format!("index loaded ({})", snapshot.status.as_str())),
        })),
        Err(err) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                details: Some(err.to_string()),
            }),
        )),
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the category service.
pub fn create_router(state: ServiceState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Category reads
        .route(CATEGORIES_PATH, get(index_handler))
        .route("/api/categories/*path", get(page_handler).head(head_handler))
        // Out-of-band cache invalidation
        .route("/api/revalidate", post(revalidate_handler))
        // Health checks
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .layer(middleware::from_fn(metrics_middleware))
        .with_state(state)
}
