//! Placement Module
//!
//! Where a new or moved object goes inside its owner.

use crate::cache::{Hvo, Tag};

/// Position within an owning property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionTarget {
    /// After the last element of a collection or sequence
    Append,
    /// Before the element currently at this index (0-based)
    AtIndex(usize),
    /// The single slot of an atomic property
    AtomicSlot,
}

/// Owner, owning property and position for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub owner: Hvo,
    pub tag: Tag,
    pub target: InsertionTarget,
}

impl Placement {
    pub fn append(owner: Hvo, tag: Tag) -> Self {
        Self {
            owner,
            tag,
            target: InsertionTarget::Append,
        }
    }

    pub fn at(owner: Hvo, tag: Tag, index: usize) -> Self {
        Self {
            owner,
            tag,
            target: InsertionTarget::AtIndex(index),
        }
    }

    pub fn atomic(owner: Hvo, tag: Tag) -> Self {
        Self {
            owner,
            tag,
            target: InsertionTarget::AtomicSlot,
        }
    }
}
