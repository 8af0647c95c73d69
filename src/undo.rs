//! Undo Action Module
//!
//! Paired old/new records of property assignments, handed to an external
//! undo/redo handler. The handler decides grouping and ordering; each action
//! only knows how to put its one key back.

use tracing::trace;

use crate::cache::{CacheValue, PropertyCache, PropertyKey};
use crate::error::Result;

/// One property assignment. `None` means "absent".
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyAction {
    pub key: PropertyKey,
    pub old: Option<CacheValue>,
    pub new: Option<CacheValue>,
}

impl PropertyAction {
    pub fn new(key: PropertyKey, old: Option<CacheValue>, new: Option<CacheValue>) -> Self {
        Self { key, old, new }
    }

    /// Restores the value held before the assignment.
    pub fn undo(&self, cache: &mut PropertyCache) -> Result<()> {
        trace!(key = %self.key, "undo property action");
        apply(cache, self.key, self.old.clone())
    }

    /// Re-applies the assignment.
    pub fn redo(&self, cache: &mut PropertyCache) -> Result<()> {
        trace!(key = %self.key, "redo property action");
        apply(cache, self.key, self.new.clone())
    }

    /// True if the action changes nothing.
    pub fn is_noop(&self) -> bool {
        self.old == self.new
    }
}

fn apply(cache: &mut PropertyCache, key: PropertyKey, value: Option<CacheValue>) -> Result<()> {
    match value {
        Some(value) => {
            cache.set(key, value)?;
        }
        None => {
            cache.remove(&key);
        }
    }
    Ok(())
}

/// Receives property actions as they happen.
pub trait ActionHandler {
    fn add_action(&mut self, action: PropertyAction);
}
