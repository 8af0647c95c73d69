//! Id Allocation Module
//!
//! Per-cache source of fresh object ids. Real ids count upward from the
//! configured start; dummy (transient) ids are negative and count downward.

use crate::cache::Hvo;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// `None` marks a range that has been used up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next_hvo: Option<Hvo>,
    next_dummy: Option<Hvo>,
}

impl IdAllocator {
    /// Creates an allocator.
    ///
    /// # Arguments
    /// * `first_hvo` - First real id; must be positive
    /// * `first_dummy` - First dummy id; must be negative
    pub fn new(first_hvo: Hvo, first_dummy: Hvo) -> Self {
        debug_assert!(first_hvo > 0, "real ids must be positive");
        debug_assert!(first_dummy < 0, "dummy ids must be negative");
        Self {
            next_hvo: Some(first_hvo),
            next_dummy: Some(first_dummy),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.first_hvo, config.first_dummy_hvo)
    }

    /// Returns a fresh real id.
    ///
    /// # Errors
    /// `InvalidArgument` once `Hvo::MAX` has been handed out or reserved.
    pub fn next_hvo(&mut self) -> Result<Hvo> {
        let hvo = self
            .next_hvo
            .ok_or_else(|| CacheError::InvalidArgument("object id range exhausted".to_string()))?;
        self.next_hvo = hvo.checked_add(1);
        Ok(hvo)
    }

    /// Returns a fresh dummy id.
    ///
    /// # Errors
    /// `InvalidArgument` once `Hvo::MIN` has been handed out.
    pub fn next_dummy(&mut self) -> Result<Hvo> {
        let hvo = self
            .next_dummy
            .ok_or_else(|| CacheError::InvalidArgument("dummy id range exhausted".to_string()))?;
        self.next_dummy = hvo.checked_sub(1);
        Ok(hvo)
    }

    /// Moves the real-id counter past `hvo`, e.g. after loading fixture data.
    /// Reserving `Hvo::MAX` exhausts the range.
    pub fn reserve_through(&mut self, hvo: Hvo) {
        if let Some(next) = self.next_hvo {
            if hvo >= next {
                self.next_hvo = hvo.checked_add(1);
            }
        }
    }

    pub fn is_dummy(hvo: Hvo) -> bool {
        hvo < 0
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
