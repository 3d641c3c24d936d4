//! Request-level error kinds.

use serde::Serialize;
use std::fmt;

/// Wire-level error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or empty path.
    InvalidRequest,
    /// Path longer than the hierarchy allows.
    InvalidDepth,
    /// Nothing matches the requested path.
    NotFound,
    /// A category was found but the requested path is not its canonical path.
    InvalidPath,
    /// Upstream returned an empty category set.
    NoCategories,
    /// Unexpected failure, e.g. upstream unreachable.
    ServerError,
}

impl ErrorKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidDepth => "invalid_depth",
            Self::NotFound => "not_found",
            Self::InvalidPath => "invalid_path",
            Self::NoCategories => "no_categories",
            Self::ServerError => "server_error",
        }
    }

    /// HTTP status code for the kind.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest | Self::InvalidDepth | Self::InvalidPath => 400,
            Self::NotFound | Self::NoCategories => 404,
            Self::ServerError => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced to callers of the graph, resolver and catalog.
///
/// Data-quality problems found while building a graph are never errors;
/// they land in `BuildDiagnostics`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    /// Missing or empty path.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Path has more segments than the hierarchy allows.
    #[error("path has {requested} segments, at most {max} allowed")]
    InvalidDepth {
        /// Number of segments requested.
        requested: usize,
        /// Maximum number of segments.
        max: usize,
    },

    /// No category matches the path (or id).
    #[error("category not found: {slug}")]
    NotFound {
        /// The requested path or id.
        slug: String,
    },

    /// The category exists but lives at a different path.
    #[error("path {requested} does not match canonical path {canonical}")]
    InvalidPath {
        /// The requested path.
        requested: String,
        /// The canonical slash-joined path.
        canonical: String,
    },

    /// Upstream returned no categories at all.
    #[error("no categories available")]
    NoCategories,

    /// Unexpected failure.
    #[error("server error: {0}")]
    ServerError(String),
}

impl CategoryError {
    /// Shorthand for `NotFound`.
    pub fn not_found(slug: impl Into<String>) -> Self {
        Self::NotFound { slug: slug.into() }
    }

    /// The wire kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidDepth { .. } => ErrorKind::InvalidDepth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::NoCategories => ErrorKind::NoCategories,
            Self::ServerError(_) => ErrorKind::ServerError,
        }
    }

    /// The slug the error refers to, if any.
    pub fn slug(&self) -> Option<&str> {
        match self {
            Self::NotFound { slug } => Some(slug),
            Self::InvalidPath { requested, .. } => Some(requested),
            _ => None,
        }
    }
}
