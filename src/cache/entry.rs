//! Cache Entry Module
//!
//! Defines a stored property value together with its last-write timestamp.

use chrono::{DateTime, Utc};

use crate::cache::CacheValue;

// == Cache Entry ==
/// Represents a single cached property value with write metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The stored value
    pub value: CacheValue,
    /// Time of the last write to this key
    pub modified_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(value: CacheValue) -> Self {
        Self {
            value,
            modified_at: Utc::now(),
        }
    }

    // == Overwrite ==
    /// Replaces the value and advances the timestamp.
    ///
    /// The timestamp never moves backwards, even if the wall clock does.
    ///
    /// # Returns
    /// The previous value.
    pub fn overwrite(&mut self, value: CacheValue) -> CacheValue {
        self.modified_at = monotonic_now(self.modified_at);
        std::mem::replace(&mut self.value, value)
    }
}

// == Utility Functions ==
/// Returns the current time, clamped to be no earlier than `previous`.
pub fn monotonic_now(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous)
}
