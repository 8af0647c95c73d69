//! Cache Module
//!
//! Provides the timestamped in-memory property cache and its value types.

mod entry;
mod key;
mod snapshot;
mod stats;
mod store;
mod value;


// Re-export public types
pub use entry::CacheEntry;
pub use key::{ClassId, Hvo, PropertyKey, Tag, WsId};
pub use snapshot::{CacheSnapshot, SnapshotEntry};
pub use stats::CacheStats;
pub use store::PropertyCache;
pub use value::{CacheValue, OpaqueRef, TextRun, TsString, ValueKind};
