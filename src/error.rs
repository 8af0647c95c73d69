//! Error types for the property cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the property cache and object layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Caller broke an API contract (zero tag, index out of range, unknown type code)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Requested data was never recorded
    #[error("Not found: {0}")]
    NotFound(String),

    /// Value kind does not match the declared field type
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Operation the in-memory store deliberately does not support
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operation attempted after the cache was disposed
    #[error("Object cache has been disposed")]
    Disposed,
}

// == Result Type Alias ==
/// Convenience Result type for the property cache.
pub type Result<T> = std::result::Result<T, CacheError>;
