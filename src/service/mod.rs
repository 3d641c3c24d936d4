//! Category REST Service
//!
//! Serves the cached category index and resolved category pages.
//!
//! ## Endpoints
//!
//! - `GET /api/categories` - Full index (tree, flat list, lookup maps)
//! - `GET /api/categories/*path` - Page aggregate for a slug path
//! - `HEAD /api/categories/*path` - 200 if the path is canonical, 404 otherwise
//! - `POST /api/revalidate` - Signed webhook that expires cached indexes
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness check
//! - `GET /health/ready` - Readiness check

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{
    metrics_middleware, normalize_path, record_resolution, record_revalidation,
    request_logging_middleware,
};
pub use routes::{create_router, ApiError, ErrorResponse, CATEGORIES_PATH};
pub use state::{sign_body, ServiceState};
