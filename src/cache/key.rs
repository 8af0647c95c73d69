//! Property Key Module
//!
//! Identifies one stored property value by object, property and an optional
//! discriminator (usually a writing system).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle to a versioned object. Zero means "no object".
pub type Hvo = i32;
/// Property (field) identifier. Zero is reserved.
pub type Tag = i32;
/// Class identifier of an object.
pub type ClassId = i32;
/// Writing system identifier.
pub type WsId = i32;

// == Property Key ==
/// Key of a single cached property value.
///
/// A plain key (`ws == None`) and an extended key (`ws == Some(_)`) never
/// collide, even when object and property match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PropertyKey {
    /// Owning object of the value
    pub hvo: Hvo,
    /// Property of the object
    pub tag: Tag,
    /// Discriminator for multi-valued properties
    pub ws: Option<WsId>,
}

impl PropertyKey {
    /// Creates a plain key.
    pub fn new(hvo: Hvo, tag: Tag) -> Self {
        Self { hvo, tag, ws: None }
    }

    /// Creates an extended key carrying a discriminator.
    pub fn with_ws(hvo: Hvo, tag: Tag, ws: WsId) -> Self {
        Self {
            hvo,
            tag,
            ws: Some(ws),
        }
    }

    /// Returns true if this key carries a discriminator.
    pub fn is_extended(&self) -> bool {
        self.ws.is_some()
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ws {
            Some(ws) => write!(f, "({}, {}, ws {})", self.hvo, self.tag, ws),
            None => write!(f, "({}, {})", self.hvo, self.tag),
        }
    }
}
