//! Service middleware for metrics and request tracking.
//!
//! ## Metrics Emitted
//!
//! - `request` - One event per request by normalized path, method, status
//! - `resolution` - Outcome of each category path resolution
//! - `revalidation` - Webhook outcomes

use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use regex_lite::Regex;
use tracing::{info, info_span, Instrument};

const CATEGORY_PREFIX: &str = "/api/categories/";

/// Metrics middleware that records request counts and latency.
///
/// Uses tracing events; log-based metrics aggregate them downstream.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "category_graph::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Request logging middleware that attaches a correlation id and timing.
///
/// The trace id comes from `X-Cloud-Trace-Context` when present, otherwise
/// a fresh UUID.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let trace_id = trace_id(&request);
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = tracing::field::Empty,
        latency_ms = tracing::field::Empty,
    );

    let response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();
    span.record("status", status);
    span.record("latency_ms", latency.as_millis() as u64);

    info!(
        target: "category_service::access",
        trace_id = %trace_id,
        method = %method,
        path = %uri,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request completed"
    );

    response
}

/// Correlation id for a request.
pub fn trace_id(request: &Request) -> String {
    request
        .headers()
        .get("X-Cloud-Trace-Context")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split('/').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn uuid_regex() -> Option<&'static Regex> {
    static UUID: OnceLock<Option<Regex>> = OnceLock::new();
    UUID.get_or_init(|| {
        Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}").ok()
    })
    .as_ref()
}

/// Normalize a path for metrics to avoid high cardinality.
///
/// Category slug paths collapse to `:path`; UUIDs become `:id`.
pub fn normalize_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix(CATEGORY_PREFIX) {
        if !rest.is_empty() {
            return format!("{}:path", CATEGORY_PREFIX);
        }
    }
    match uuid_regex() {
        Some(regex) => regex.replace_all(path, ":id").to_string(),
        None => path.to_string(),
    }
}

/// Record the outcome of a category path resolution.
pub fn record_resolution(outcome: &str, segments: usize, cache_status: &str) {
    info!(
        target: "category_graph::metrics",
        metric_type = "resolution",
        outcome = outcome,
        segments = segments,
        cache_status = cache_status,
        "resolution_metric"
    );
}

/// Record a revalidation webhook outcome.
pub fn record_revalidation(accepted: bool, entries: usize) {
    let result = if accepted { "accepted" } else { "rejected" };
    info!(
        target: "category_graph::metrics",
        metric_type = "revalidation",
        result = result,
        entries = entries,
        "revalidation_metric"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_normalize_path_collapses_category_slugs() {
        assert_eq!(
            normalize_path("/api/categories/bijoux/colliers/or"),
            "/api/categories/:path"
        );
        assert_eq!(normalize_path("/api/categories"), "/api/categories");
    }

    #[test]
    fn test_normalize_path_replaces_uuid() {
        let path = "/api/things/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/things/:id");
    }

    #[test]
    fn test_normalize_path_preserves_regular_path() {
        assert_eq!(normalize_path("/health/ready"), "/health/ready");
    }

    #[test]
    fn test_trace_id_from_cloud_header() {
        let request = axum::http::Request::builder()
            .header("X-Cloud-Trace-Context", "105445aa7843bc8bf206b120001000/1;o=1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(trace_id(&request), "105445aa7843bc8bf206b120001000");
    }

    #[test]
    fn test_trace_id_generated() {
        let request = axum::http::Request::builder().body(Body::empty()).unwrap();
        assert_eq!(trace_id(&request).len(), 36);
    }
}
