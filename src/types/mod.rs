//! Core types for the category graph.

pub mod record;
pub mod node;
pub mod error;

pub use record::{CategoryId, CategoryRecord};
pub use node::{CategoryNode, Placement};
pub use error::{CategoryError, ErrorKind};
