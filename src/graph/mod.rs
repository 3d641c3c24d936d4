//! Category graph: construction, index and views.

pub mod builder;
pub mod diagnostics;
pub mod index;
pub mod view;

pub use builder::{BuildOptions, CategoryGraphBuilder};
pub use diagnostics::{BuildDiagnostics, HandleCollision};
pub use index::CategoryGraphIndex;
pub use view::{IndexView, TreeNodeView};
