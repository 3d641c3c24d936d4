//! Category Service Binary
//!
//! Runs the category graph as a REST API service:
//! - Structured JSON logging for Cloud Logging
//! - Request tracing with correlation IDs
//! - Graceful shutdown handling
//! - Health check endpoints
//!
//! ## Configuration
//!
//! See [`category_graph::ServiceConfig`] for the full list. The most common:
//! - `UPSTREAM_URL`: search service base URL (default: http://localhost:7700)
//! - `UPSTREAM_API_KEY`: bearer token for the search service
//! - `REVALIDATE_SECRET`: enables the signed revalidation webhook
//! - `PORT`: Service port (default: 8080)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! UPSTREAM_URL=http://search:7700 cargo run --bin category_service --features service
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use category_graph::config::LogFormat;
use category_graph::service::{create_router, request_logging_middleware, ServiceState};
use category_graph::{HttpCategorySource, InMemoryCategorySource, ServiceConfig, SourceRegistry};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "category_service=info,category_graph=info,tower_http=info".into());

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_span_events(FmtSpan::CLOSE))
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE)
                        .flatten_event(true),
                )
                .init();
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM; in-flight requests drain afterwards.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };
    info!(signal, "Shutting down; draining in-flight requests");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env();
    init_tracing(config.log_format);

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");
    info!(version = version, build_sha = build_sha, "Starting Category Service");

    // Register providers; CATEGORY_SOURCE picks one
    let mut sources = SourceRegistry::new();
    sources.register(Arc::new(HttpCategorySource::from_config(
        config.http_source_config(),
    )?));
    sources.register(Arc::new(InMemoryCategorySource::default()));
    info!(
        sources = ?sources.names(),
        selected = %config.source,
        upstream = %config.upstream_url,
        index = %config.upstream_index,
        "Source registry initialized"
    );

    let mut state = ServiceState::from_registry(sources, &config.source, config.catalog_options())?
        .with_features(config.features.clone());
    match &config.revalidate_secret {
        Some(secret) => state = state.with_revalidate_secret(secret.as_bytes()),
        None => warn!("REVALIDATE_SECRET not set; revalidation webhook disabled"),
    }

    // Warm the cache; failures are not fatal, requests retry the fetch
    match state.catalog.refresh().await {
        Ok(index) => info!(
            total = index.total(),
            max_depth = index.max_depth(),
            fingerprint = index.fingerprint(),
            "Category index warmed"
        ),
        Err(e) => warn!(error = %e, "Initial category fetch failed"),
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = config.bind_addr().parse()?;
    info!(address = %addr, version = version, "Category Service listening");

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Category Service stopped");

    Ok(())
}
