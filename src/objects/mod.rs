//! Objects Module
//!
//! Object-level operations on top of the property cache: typed access,
//! creation, deletion, moves and deep copies within ownership trees.

mod lifecycle;
mod object_cache;
mod placement;

// Re-export public types
pub use object_cache::ObjectCache;
pub use placement::{InsertionTarget, Placement};
