//! Snapshot Module
//!
//! Serializable picture of the property cache, used to dump state when a test
//! fails and to load fixture data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheStats, CacheValue, PropertyKey};
use crate::error::{CacheError, Result};

/// One cached value with its key and last-write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub key: PropertyKey,
    pub value: CacheValue,
    pub modified_at: DateTime<Utc>,
}

/// All serializable entries of a cache, sorted by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<SnapshotEntry>,
    pub dirty: bool,
    /// Statistics at the time of capture; informational only
    #[serde(default)]
    pub stats: CacheStats,
}

impl CacheSnapshot {
    /// Renders the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Parses a snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CacheError::Serialization(e.to_string()))
    }
}
