//! Cached Value Module
//!
//! Closed set of value shapes the property cache can hold.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::{Hvo, WsId};

// == Text Run ==
/// A run of a rich string: text from `start` up to the next run shares `ws`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    /// Byte offset where the run starts
    pub start: usize,
    /// Writing system of the run
    pub ws: WsId,
}

// == Rich String ==
/// Structured string whose runs are tagged with writing systems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TsString {
    text: String,
    runs: Vec<TextRun>,
}

impl TsString {
    /// Creates a single-run string in one writing system.
    pub fn new(text: impl Into<String>, ws: WsId) -> Self {
        let text = text.into();
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![TextRun { start: 0, ws }]
        };
        Self { text, runs }
    }

    /// Appends text in the given writing system, merging with the last run
    /// when the writing system is unchanged.
    pub fn push_run(&mut self, text: &str, ws: WsId) {
        if text.is_empty() {
            return;
        }
        if self.runs.last().map(|run| run.ws) != Some(ws) {
            self.runs.push(TextRun {
                start: self.text.len(),
                ws,
            });
        }
        self.text.push_str(text);
    }

    /// Returns the plain text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the runs in order.
    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }

    /// Returns the writing system in effect at a byte offset.
    pub fn ws_at(&self, offset: usize) -> Option<WsId> {
        if offset >= self.text.len() {
            return None;
        }
        self.runs
            .iter()
            .rev()
            .find(|run| run.start <= offset)
            .map(|run| run.ws)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

// == Opaque Reference ==
/// Arbitrary shared object stored as-is. Compares by identity.
#[derive(Clone)]
pub struct OpaqueRef(Arc<dyn Any + Send + Sync>);

impl OpaqueRef {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrows the referenced object if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for OpaqueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueRef({:p})", Arc::as_ptr(&self.0))
    }
}

impl PartialEq for OpaqueRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for OpaqueRef {}

// == Value Kind ==
/// Runtime shape of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Int,
    Int64,
    Bool,
    Guid,
    Binary,
    Unicode,
    RichText,
    Vector,
    Opaque,
}

// == Cache Value ==
/// A value held by the property cache.
///
/// Atomic object references are stored as `Int(hvo)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheValue {
    Int(i32),
    Int64(i64),
    Bool(bool),
    Guid(Uuid),
    Binary(Vec<u8>),
    Unicode(String),
    RichText(TsString),
    Vector(Vec<Hvo>),
    #[serde(skip)]
    Opaque(OpaqueRef),
}

impl CacheValue {
    /// Returns the runtime kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            CacheValue::Int(_) => ValueKind::Int,
            CacheValue::Int64(_) => ValueKind::Int64,
            CacheValue::Bool(_) => ValueKind::Bool,
            CacheValue::Guid(_) => ValueKind::Guid,
            CacheValue::Binary(_) => ValueKind::Binary,
            CacheValue::Unicode(_) => ValueKind::Unicode,
            CacheValue::RichText(_) => ValueKind::RichText,
            CacheValue::Vector(_) => ValueKind::Vector,
            CacheValue::Opaque(_) => ValueKind::Opaque,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            CacheValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int64(&self) -> Option<i64> {
        match self {
            CacheValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CacheValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_guid(&self) -> Option<Uuid> {
        match self {
            CacheValue::Guid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            CacheValue::Binary(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_unicode(&self) -> Option<&str> {
        match self {
            CacheValue::Unicode(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_rich_text(&self) -> Option<&TsString> {
        match self {
            CacheValue::RichText(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Hvo]> {
        match self {
            CacheValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_opaque(&self) -> Option<&OpaqueRef> {
        match self {
            CacheValue::Opaque(v) => Some(v),
            _ => None,
        }
    }

    /// Object ids referenced by this value: the elements of a vector, or the
    /// single id of an atomic reference.
    pub fn referenced_objects(&self) -> Vec<Hvo> {
        match self {
            CacheValue::Vector(items) => items.clone(),
            CacheValue::Int(hvo) if *hvo != 0 => vec![*hvo],
            _ => Vec::new(),
        }
    }
}
