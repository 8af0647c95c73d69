//! Metadata Module
//!
//! Property schema knowledge the cache consults but does not own: which kind
//! of field a tag is, and in particular whether it owns its targets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cache::{Tag, ValueKind};
use crate::error::CacheError;

// == Bookkeeping Tags ==
/// GUID of every object.
pub const GUID_TAG: Tag = 100;
/// Class id of every object.
pub const CLASS_TAG: Tag = 101;
/// Owning object, 0 if unowned.
pub const OWNER_TAG: Tag = 102;
/// Property of the owner that holds the object.
pub const OWN_FLID_TAG: Tag = 103;
/// Ordinal of the object within the owning property.
pub const OWN_ORD_TAG: Tag = 104;

// == Field Type ==
/// Declared kind of a property. Discriminants match the persistent store's codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum FieldType {
    Boolean = 1,
    Integer = 2,
    Numeric = 3,
    Float = 4,
    Time = 5,
    Guid = 6,
    Image = 7,
    GenDate = 8,
    Binary = 9,
    String = 13,
    MultiString = 14,
    Unicode = 15,
    MultiUnicode = 16,
    OwningAtomic = 23,
    ReferenceAtomic = 24,
    OwningCollection = 25,
    ReferenceCollection = 26,
    OwningSequence = 27,
    ReferenceSequence = 28,
}

impl FieldType {
    /// True for properties whose targets live and die with the owner.
    pub fn is_owning(self) -> bool {
        matches!(
            self,
            FieldType::OwningAtomic | FieldType::OwningCollection | FieldType::OwningSequence
        )
    }

    /// True for properties whose values are object ids.
    pub fn is_object(self) -> bool {
        self.is_atomic_object() || self.is_vector()
    }

    pub fn is_atomic_object(self) -> bool {
        matches!(self, FieldType::OwningAtomic | FieldType::ReferenceAtomic)
    }

    /// True for collection and sequence properties.
    pub fn is_vector(self) -> bool {
        matches!(
            self,
            FieldType::OwningCollection
                | FieldType::ReferenceCollection
                | FieldType::OwningSequence
                | FieldType::ReferenceSequence
        )
    }

    /// True for properties keyed additionally by writing system.
    pub fn is_multi(self) -> bool {
        matches!(self, FieldType::MultiString | FieldType::MultiUnicode)
    }

    /// Returns whether a stored value of `kind` is the runtime shape of this field type.
    pub fn accepts(self, kind: ValueKind) -> bool {
        match self {
            FieldType::Boolean => kind == ValueKind::Bool,
            FieldType::Integer | FieldType::Numeric | FieldType::Float => kind == ValueKind::Int,
            FieldType::Time | FieldType::GenDate => {
                matches!(kind, ValueKind::Int64 | ValueKind::Int)
            }
            FieldType::Guid => kind == ValueKind::Guid,
            FieldType::Image | FieldType::Binary => kind == ValueKind::Binary,
            FieldType::String | FieldType::MultiString => kind == ValueKind::RichText,
            FieldType::Unicode | FieldType::MultiUnicode => kind == ValueKind::Unicode,
            FieldType::OwningAtomic | FieldType::ReferenceAtomic => kind == ValueKind::Int,
            FieldType::OwningCollection
            | FieldType::ReferenceCollection
            | FieldType::OwningSequence
            | FieldType::ReferenceSequence => kind == ValueKind::Vector,
        }
    }
}

impl TryFrom<i32> for FieldType {
    type Error = CacheError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        let field_type = match code {
            1 => FieldType::Boolean,
            2 => FieldType::Integer,
            3 => FieldType::Numeric,
            4 => FieldType::Float,
            5 => FieldType::Time,
            6 => FieldType::Guid,
            7 => FieldType::Image,
            8 => FieldType::GenDate,
            9 => FieldType::Binary,
            13 => FieldType::String,
            14 => FieldType::MultiString,
            15 => FieldType::Unicode,
            16 => FieldType::MultiUnicode,
            23 => FieldType::OwningAtomic,
            24 => FieldType::ReferenceAtomic,
            25 => FieldType::OwningCollection,
            26 => FieldType::ReferenceCollection,
            27 => FieldType::OwningSequence,
            28 => FieldType::ReferenceSequence,
            other => {
                return Err(CacheError::InvalidArgument(format!(
                    "unrecognized field type code {}",
                    other
                )))
            }
        };
        Ok(field_type)
    }
}

// == Metadata Service ==
/// Schema lookups the object layer depends on.
pub trait MetadataService {
    /// Declared kind of a property, or None if the tag is unknown.
    fn field_type(&self, tag: Tag) -> Option<FieldType>;

    /// Human-readable name of a property.
    fn field_name(&self, tag: Tag) -> Option<&str>;

    /// Convenience: true if the tag is a known owning property.
    fn is_owning(&self, tag: Tag) -> bool {
        self.field_type(tag).is_some_and(FieldType::is_owning)
    }
}

#[derive(Debug, Clone)]
struct FieldInfo {
    name: String,
    field_type: FieldType,
}

// == Schema Registry ==
/// In-memory metadata built up by hand, typically in test setup.
///
/// The bookkeeping tags are registered up front.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    fields: HashMap<Tag, FieldInfo>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
        .with_field(GUID_TAG, "CmObject.Guid", FieldType::Guid)
        .with_field(CLASS_TAG, "CmObject.Class", FieldType::Integer)
        .with_field(OWNER_TAG, "CmObject.Owner", FieldType::ReferenceAtomic)
        .with_field(OWN_FLID_TAG, "CmObject.OwnFlid", FieldType::Integer)
        .with_field(OWN_ORD_TAG, "CmObject.OwnOrd", FieldType::Integer)
    }

    /// Registers (or replaces) a field.
    pub fn with_field(mut self, tag: Tag, name: &str, field_type: FieldType) -> Self {
        self.register(tag, name, field_type);
        self
    }

    pub fn register(&mut self, tag: Tag, name: &str, field_type: FieldType) {
        self.fields.insert(
            tag,
            FieldInfo {
                name: name.to_string(),
                field_type,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataService for SchemaRegistry {
    fn field_type(&self, tag: Tag) -> Option<FieldType> {
        self.fields.get(&tag).map(|info| info.field_type)
    }

    fn field_name(&self, tag: Tag) -> Option<&str> {
        self.fields.get(&tag).map(|info| info.name.as_str())
    }
}
