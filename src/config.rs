//! Configuration Module
//!
//! Handles loading object cache settings from environment variables.

use std::env;

use crate::cache::Hvo;

/// Object cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// First real object id handed out by the allocator
    pub first_hvo: Hvo,
    /// First dummy object id; dummy ids count downward from here
    pub first_dummy_hvo: Hvo,
    /// Check typed writes against the metadata schema
    pub validate_writes: bool,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FDO_FIRST_HVO` - First real object id (default: 1)
    /// - `FDO_FIRST_DUMMY_HVO` - First dummy object id (default: -1000000)
    /// - `FDO_VALIDATE_WRITES` - Schema validation on write (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            first_hvo: env::var("FDO_FIRST_HVO")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|hvo: &Hvo| *hvo > 0)
                .unwrap_or(defaults.first_hvo),
            first_dummy_hvo: env::var("FDO_FIRST_DUMMY_HVO")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|hvo: &Hvo| *hvo < 0)
                .unwrap_or(defaults.first_dummy_hvo),
            validate_writes: env::var("FDO_VALIDATE_WRITES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.validate_writes),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            first_hvo: 1,
            first_dummy_hvo: -1_000_000,
            validate_writes: true,
        }
    }
}
