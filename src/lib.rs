//! FDO Cache - An in-memory object property cache
//!
//! Stores properties of persistent objects keyed by (object, property,
//! writing system), with last-modified timestamps, a dirty flag, change
//! notification, undo recording and owning-hierarchy operations.

pub mod cache;
pub mod config;
pub mod error;
pub mod ids;
pub mod metadata;
pub mod notify;
pub mod objects;
pub mod undo;
pub mod writing_system;

pub use cache::{CacheValue, Hvo, PropertyCache, PropertyKey, Tag, TsString, WsId};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use metadata::{FieldType, MetadataService, SchemaRegistry};
pub use notify::{ChangeListener, NotifierRegistry, PropChange};
pub use objects::{InsertionTarget, ObjectCache, Placement};
