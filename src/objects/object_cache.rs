//! Object Cache Module
//!
//! Typed property access over the property cache, with schema validation,
//! change notification, undo recording and an owner -> owned index.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::{
    CacheSnapshot, CacheStats, CacheValue, ClassId, Hvo, OpaqueRef, PropertyCache, PropertyKey,
    Tag, TsString, WsId,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::ids::IdAllocator;
use crate::metadata::{
    FieldType, MetadataService, CLASS_TAG, GUID_TAG, OWNER_TAG, OWN_FLID_TAG, OWN_ORD_TAG,
};
use crate::notify::{NotifierRegistry, PropChange};
use crate::undo::{ActionHandler, PropertyAction};

// == Object Cache ==
/// In-memory object store built on [`PropertyCache`].
///
/// Reads of absent properties return neutral defaults (0, false, empty).
/// Every public operation fails with [`CacheError::Disposed`] after
/// [`ObjectCache::dispose`].
pub struct ObjectCache {
    pub(super) store: PropertyCache,
    pub(super) metadata: Box<dyn MetadataService>,
    pub(super) ids: IdAllocator,
    pub(super) notifier: NotifierRegistry,
    pub(super) action_handler: Option<Box<dyn ActionHandler>>,
    pub(super) config: CacheConfig,
    /// Owner -> objects whose Owner property points at it
    pub(super) owned: HashMap<Hvo, BTreeSet<Hvo>>,
    pub(super) disposed: bool,
}

impl ObjectCache {
    // == Constructors ==
    /// Creates a cache with the default configuration.
    pub fn new(metadata: impl MetadataService + 'static) -> Self {
        Self::with_config(metadata, CacheConfig::default())
    }

    pub fn with_config(metadata: impl MetadataService + 'static, config: CacheConfig) -> Self {
        let ids = IdAllocator::from_config(&config);
        Self::with_allocator(metadata, config, ids)
    }

    /// Creates a cache drawing object ids from the given allocator.
    pub fn with_allocator(
        metadata: impl MetadataService + 'static,
        config: CacheConfig,
        ids: IdAllocator,
    ) -> Self {
        Self {
            store: PropertyCache::new(),
            metadata: Box::new(metadata),
            ids,
            notifier: NotifierRegistry::new(),
            action_handler: None,
            config,
            owned: HashMap::new(),
            disposed: false,
        }
    }

    // == Accessors ==
    pub fn store(&self) -> Result<&PropertyCache> {
        self.ensure_live()?;
        Ok(&self.store)
    }

    pub fn metadata(&self) -> Result<&dyn MetadataService> {
        self.ensure_live()?;
        Ok(self.metadata.as_ref())
    }

    /// Listener registry for property changes.
    pub fn notifier(&self) -> Result<&NotifierRegistry> {
        self.ensure_live()?;
        Ok(&self.notifier)
    }

    pub fn config(&self) -> Result<&CacheConfig> {
        self.ensure_live()?;
        Ok(&self.config)
    }

    /// Installs the handler that receives one action per property assignment.
    pub fn set_action_handler(&mut self, handler: Box<dyn ActionHandler>) -> Result<()> {
        self.ensure_live()?;
        self.action_handler = Some(handler);
        Ok(())
    }

    pub fn take_action_handler(&mut self) -> Result<Option<Box<dyn ActionHandler>>> {
        self.ensure_live()?;
        Ok(self.action_handler.take())
    }

    // == Store Bookkeeping ==
    /// Time of the last write to a property.
    pub fn timestamp(&self, hvo: Hvo, tag: Tag, ws: Option<WsId>) -> Result<DateTime<Utc>> {
        self.ensure_live()?;
        self.store.timestamp(&PropertyKey { hvo, tag, ws })
    }

    pub fn is_dirty(&self) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.store.is_dirty())
    }

    pub fn clear_dirty(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.store.clear_dirty();
        Ok(())
    }

    /// Drops all cached data. Listeners and the action handler stay installed.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.store.clear();
        self.owned.clear();
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats> {
        self.ensure_live()?;
        Ok(self.store.stats())
    }

    pub fn snapshot(&self) -> Result<CacheSnapshot> {
        self.ensure_live()?;
        Ok(self.store.snapshot())
    }

    /// Loads a snapshot, rebuilding the ownership index and moving the id
    /// allocator past every id it stores or references.
    pub fn restore_snapshot(&mut self, snapshot: CacheSnapshot) -> Result<()> {
        self.ensure_live()?;
        self.store.restore(snapshot)?;

        self.owned.clear();
        let mut highest = 0;
        let mut links = Vec::new();
        for (key, value) in self.store.iter() {
            highest = highest.max(key.hvo);
            for referenced in self.referenced_ids(key, value) {
                highest = highest.max(referenced);
            }
            if key.tag == OWNER_TAG && key.ws.is_none() {
                if let Some(owner) = value.as_int().filter(|owner| *owner != 0) {
                    links.push((owner, key.hvo));
                }
            }
        }
        for (owner, child) in links {
            self.owned.entry(owner).or_default().insert(child);
        }
        if highest > 0 {
            self.ids.reserve_through(highest);
        }
        Ok(())
    }

    // == Typed Getters ==
    pub fn int_prop(&self, hvo: Hvo, tag: Tag) -> Result<i32> {
        Ok(self.read(PropertyKey::new(hvo, tag), CacheValue::as_int)?.unwrap_or(0))
    }

    pub fn int64_prop(&self, hvo: Hvo, tag: Tag) -> Result<i64> {
        Ok(self.read(PropertyKey::new(hvo, tag), CacheValue::as_int64)?.unwrap_or(0))
    }

    /// Time properties are stored as 64-bit integers.
    pub fn time_prop(&self, hvo: Hvo, tag: Tag) -> Result<i64> {
        self.int64_prop(hvo, tag)
    }

    pub fn bool_prop(&self, hvo: Hvo, tag: Tag) -> Result<bool> {
        Ok(self.read(PropertyKey::new(hvo, tag), CacheValue::as_bool)?.unwrap_or(false))
    }

    /// Returns the nil GUID if absent.
    pub fn guid_prop(&self, hvo: Hvo, tag: Tag) -> Result<Uuid> {
        Ok(self
            .read(PropertyKey::new(hvo, tag), CacheValue::as_guid)?
            .unwrap_or_else(Uuid::nil))
    }

    pub fn unicode_prop(&self, hvo: Hvo, tag: Tag) -> Result<String> {
        Ok(self
            .read(PropertyKey::new(hvo, tag), |v| v.as_unicode().map(str::to_string))?
            .unwrap_or_default())
    }

    pub fn multi_unicode_alt(&self, hvo: Hvo, tag: Tag, ws: WsId) -> Result<String> {
        Ok(self
            .read(PropertyKey::with_ws(hvo, tag, ws), |v| {
                v.as_unicode().map(str::to_string)
            })?
            .unwrap_or_default())
    }

    pub fn string_prop(&self, hvo: Hvo, tag: Tag) -> Result<TsString> {
        Ok(self
            .read(PropertyKey::new(hvo, tag), |v| v.as_rich_text().cloned())?
            .unwrap_or_default())
    }

    pub fn multi_string_alt(&self, hvo: Hvo, tag: Tag, ws: WsId) -> Result<TsString> {
        Ok(self
            .read(PropertyKey::with_ws(hvo, tag, ws), |v| {
                v.as_rich_text().cloned()
            })?
            .unwrap_or_default())
    }

    pub fn binary_prop(&self, hvo: Hvo, tag: Tag) -> Result<Vec<u8>> {
        Ok(self
            .read(PropertyKey::new(hvo, tag), |v| v.as_binary().map(<[u8]>::to_vec))?
            .unwrap_or_default())
    }

    /// Atomic object reference; 0 if absent.
    pub fn obj_prop(&self, hvo: Hvo, tag: Tag) -> Result<Hvo> {
        self.int_prop(hvo, tag)
    }

    pub fn unknown_prop(&self, hvo: Hvo, tag: Tag) -> Result<Option<OpaqueRef>> {
        self.read(PropertyKey::new(hvo, tag), |v| v.as_opaque().cloned())
    }

    /// Number of elements of a vector property.
    ///
    /// An absent property and an empty vector both report 0; use
    /// [`ObjectCache::is_prop_in_cache`] to tell them apart.
    pub fn vec_size(&self, hvo: Hvo, tag: Tag) -> Result<usize> {
        Ok(self
            .read(PropertyKey::new(hvo, tag), |v| v.as_vector().map(<[Hvo]>::len))?
            .unwrap_or(0))
    }

    /// Element `index` of a vector property.
    ///
    /// # Errors
    /// `InvalidArgument` if `index` is past the end.
    pub fn vec_item(&self, hvo: Hvo, tag: Tag, index: usize) -> Result<Hvo> {
        let items = self.vec_prop(hvo, tag)?;
        items.get(index).copied().ok_or_else(|| {
            CacheError::InvalidArgument(format!(
                "index {} out of range for ({}, {}) of size {}",
                index,
                hvo,
                tag,
                items.len()
            ))
        })
    }

    pub fn vec_prop(&self, hvo: Hvo, tag: Tag) -> Result<Vec<Hvo>> {
        Ok(self
            .read(PropertyKey::new(hvo, tag), |v| v.as_vector().map(<[Hvo]>::to_vec))?
            .unwrap_or_default())
    }

    pub fn is_prop_in_cache(&self, hvo: Hvo, tag: Tag, ws: Option<WsId>) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.store.contains(&PropertyKey { hvo, tag, ws }))
    }

    /// Checks the runtime shape of the stored value against a field type.
    ///
    /// Absent properties report false. Callers holding a raw type code convert
    /// it with `FieldType::try_from`, which rejects unknown codes.
    pub fn is_property_of_type(
        &self,
        hvo: Hvo,
        tag: Tag,
        ws: Option<WsId>,
        field_type: FieldType,
    ) -> Result<bool> {
        Ok(self
            .read(PropertyKey { hvo, tag, ws }, |v| Some(field_type.accepts(v.kind())))?
            .unwrap_or(false))
    }

    pub fn object_exists(&self, hvo: Hvo) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.store.has_object(hvo))
    }

    pub fn class_of(&self, hvo: Hvo) -> Result<ClassId> {
        self.int_prop(hvo, CLASS_TAG)
    }

    pub fn guid_of(&self, hvo: Hvo) -> Result<Uuid> {
        self.guid_prop(hvo, GUID_TAG)
    }

    pub fn owner_of(&self, hvo: Hvo) -> Result<Hvo> {
        self.int_prop(hvo, OWNER_TAG)
    }

    pub fn owning_flid_of(&self, hvo: Hvo) -> Result<Tag> {
        self.int_prop(hvo, OWN_FLID_TAG)
    }

    pub fn ordinal_of(&self, hvo: Hvo) -> Result<i32> {
        self.int_prop(hvo, OWN_ORD_TAG)
    }

    /// Objects whose Owner property points at `owner`, in id order.
    pub fn owned_objects(&self, owner: Hvo) -> Result<Vec<Hvo>> {
        self.ensure_live()?;
        Ok(self
            .owned
            .get(&owner)
            .map(|children| children.iter().copied().collect())
            .unwrap_or_default())
    }

    // == Typed Setters ==
    pub fn set_int(&mut self, hvo: Hvo, tag: Tag, value: i32) -> Result<()> {
        self.assign(PropertyKey::new(hvo, tag), CacheValue::Int(value))
    }

    pub fn set_int64(&mut self, hvo: Hvo, tag: Tag, value: i64) -> Result<()> {
        self.assign(PropertyKey::new(hvo, tag), CacheValue::Int64(value))
    }

    pub fn set_time(&mut self, hvo: Hvo, tag: Tag, value: i64) -> Result<()> {
        self.set_int64(hvo, tag, value)
    }

    pub fn set_boolean(&mut self, hvo: Hvo, tag: Tag, value: bool) -> Result<()> {
        self.assign(PropertyKey::new(hvo, tag), CacheValue::Bool(value))
    }

    pub fn set_guid(&mut self, hvo: Hvo, tag: Tag, value: Uuid) -> Result<()> {
        self.assign(PropertyKey::new(hvo, tag), CacheValue::Guid(value))
    }

    pub fn set_unicode(&mut self, hvo: Hvo, tag: Tag, value: &str) -> Result<()> {
        self.assign(
            PropertyKey::new(hvo, tag),
            CacheValue::Unicode(value.to_string()),
        )
    }

    pub fn set_multi_unicode_alt(&mut self, hvo: Hvo, tag: Tag, ws: WsId, value: &str) -> Result<()> {
        self.assign(
            PropertyKey::with_ws(hvo, tag, ws),
            CacheValue::Unicode(value.to_string()),
        )
    }

    pub fn set_string(&mut self, hvo: Hvo, tag: Tag, value: TsString) -> Result<()> {
        self.assign(PropertyKey::new(hvo, tag), CacheValue::RichText(value))
    }

    pub fn set_multi_string_alt(&mut self, hvo: Hvo, tag: Tag, ws: WsId, value: TsString) -> Result<()> {
        self.assign(PropertyKey::with_ws(hvo, tag, ws), CacheValue::RichText(value))
    }

    pub fn set_binary(&mut self, hvo: Hvo, tag: Tag, value: &[u8]) -> Result<()> {
        self.assign(PropertyKey::new(hvo, tag), CacheValue::Binary(value.to_vec()))
    }

    /// Sets an atomic reference. Owning atomic properties are filled through
    /// `create_object` or `move_owned_object` instead.
    pub fn set_obj_prop(&mut self, hvo: Hvo, tag: Tag, target: Hvo) -> Result<()> {
        if self.metadata.is_owning(tag) {
            return Err(CacheError::InvalidArgument(format!(
                "tag {} is owning; use create_object or move_owned_object",
                tag
            )));
        }
        self.assign(PropertyKey::new(hvo, tag), CacheValue::Int(target))
    }

    pub fn set_unknown(&mut self, hvo: Hvo, tag: Tag, value: OpaqueRef) -> Result<()> {
        self.assign(PropertyKey::new(hvo, tag), CacheValue::Opaque(value))
    }

    // == Loaders ==
    /// Stores a value as if read from the backing store: no undo action, no
    /// notification.
    pub fn cache_value(&mut self, key: PropertyKey, value: CacheValue) -> Result<()> {
        self.ensure_live()?;
        check_hvo(key.hvo)?;
        self.check_kind(&key, &value)?;
        let highest = self
            .referenced_ids(&key, &value)
            .into_iter()
            .chain(std::iter::once(key.hvo))
            .max()
            .unwrap_or(0);
        if highest > 0 {
            self.ids.reserve_through(highest);
        }
        self.put(key, value, false)
    }

    pub fn cache_int_prop(&mut self, hvo: Hvo, tag: Tag, value: i32) -> Result<()> {
        self.cache_value(PropertyKey::new(hvo, tag), CacheValue::Int(value))
    }

    pub fn cache_guid_prop(&mut self, hvo: Hvo, tag: Tag, value: Uuid) -> Result<()> {
        self.cache_value(PropertyKey::new(hvo, tag), CacheValue::Guid(value))
    }

    pub fn cache_unicode_prop(&mut self, hvo: Hvo, tag: Tag, value: &str) -> Result<()> {
        self.cache_value(
            PropertyKey::new(hvo, tag),
            CacheValue::Unicode(value.to_string()),
        )
    }

    pub fn cache_string_prop(&mut self, hvo: Hvo, tag: Tag, value: TsString) -> Result<()> {
        self.cache_value(PropertyKey::new(hvo, tag), CacheValue::RichText(value))
    }

    pub fn cache_multi_string_alt(&mut self, hvo: Hvo, tag: Tag, ws: WsId, value: TsString) -> Result<()> {
        self.cache_value(PropertyKey::with_ws(hvo, tag, ws), CacheValue::RichText(value))
    }

    pub fn cache_obj_prop(&mut self, hvo: Hvo, tag: Tag, target: Hvo) -> Result<()> {
        self.cache_value(PropertyKey::new(hvo, tag), CacheValue::Int(target))
    }

    pub fn cache_vec_prop(&mut self, hvo: Hvo, tag: Tag, items: &[Hvo]) -> Result<()> {
        self.cache_value(PropertyKey::new(hvo, tag), CacheValue::Vector(items.to_vec()))
    }

    // == Undo Support ==
    /// Puts back the value an action replaced, keeping the ownership index
    /// consistent. Not itself recorded.
    pub fn apply_undo(&mut self, action: &PropertyAction) -> Result<()> {
        self.ensure_live()?;
        self.restore_value(action.key, action.old.clone())
    }

    /// Re-applies an action. Not itself recorded.
    pub fn apply_redo(&mut self, action: &PropertyAction) -> Result<()> {
        self.ensure_live()?;
        self.restore_value(action.key, action.new.clone())
    }

    fn restore_value(&mut self, key: PropertyKey, value: Option<CacheValue>) -> Result<()> {
        match value {
            Some(value) => self.put(key, value, false)?,
            None => {
                self.take(&key, false);
            }
        }
        self.notify(PropChange::simple(key.hvo, key.tag));
        Ok(())
    }

    // == Unsupported ==
    /// Extra data on relation rows is not modelled in memory.
    pub fn relation_extra(&self, hvo: Hvo, tag: Tag, target: Hvo) -> Result<String> {
        self.ensure_live()?;
        Err(CacheError::NotImplemented(format!(
            "relation extra field for ({}, {}) -> {}",
            hvo, tag, target
        )))
    }

    /// Loading by query needs a database backend.
    pub fn load_sql(&mut self, sql: &str) -> Result<()> {
        self.ensure_live()?;
        Err(CacheError::NotImplemented(format!(
            "query loading ({} bytes of SQL)",
            sql.len()
        )))
    }

    // == Teardown ==
    /// Drops all data, listeners and the action handler. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.store.clear();
        self.owned.clear();
        self.notifier.clear();
        self.action_handler = None;
        self.disposed = true;
        info!("object cache disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_dummy(hvo: Hvo) -> bool {
        IdAllocator::is_dummy(hvo)
    }

    // == Internals ==
    pub(super) fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(CacheError::Disposed)
        } else {
            Ok(())
        }
    }

    fn read<T>(&self, key: PropertyKey, extract: impl FnOnce(&CacheValue) -> Option<T>) -> Result<Option<T>> {
        self.ensure_live()?;
        Ok(self.store.get(&key).and_then(extract))
    }

    fn assign(&mut self, key: PropertyKey, value: CacheValue) -> Result<()> {
        self.ensure_live()?;
        check_hvo(key.hvo)?;
        self.check_kind(&key, &value)?;
        self.put(key, value, true)?;
        let index = key.ws.map_or(0, |ws| usize::try_from(ws).unwrap_or(0));
        self.notify(PropChange::new(key.hvo, key.tag, index, 0, 0));
        Ok(())
    }

    /// Checks a write against the schema: value kind, and a writing system
    /// present exactly on multilingual fields.
    fn check_kind(&self, key: &PropertyKey, value: &CacheValue) -> Result<()> {
        if !self.config.validate_writes {
            return Ok(());
        }
        let Some(field_type) = self.metadata.field_type(key.tag) else {
            return Ok(());
        };
        let name = self.metadata.field_name(key.tag).unwrap_or("field");
        if !field_type.accepts(value.kind()) {
            return Err(CacheError::TypeMismatch(format!(
                "{} is {:?} but value is {:?}",
                name,
                field_type,
                value.kind()
            )));
        }
        if field_type.is_multi() != key.ws.is_some() {
            return Err(CacheError::InvalidArgument(format!(
                "{} is {:?}; key {} has the wrong writing system shape",
                name, field_type, key
            )));
        }
        Ok(())
    }

    /// Object ids a stored value points at: vector elements, Owner stamps
    /// and atomic object properties.
    fn referenced_ids(&self, key: &PropertyKey, value: &CacheValue) -> Vec<Hvo> {
        let is_object = key.tag == OWNER_TAG
            || self
                .field_type(key.tag)
                .is_some_and(FieldType::is_atomic_object);
        match value {
            CacheValue::Vector(items) => items.clone(),
            CacheValue::Int(target) if is_object && *target != 0 => vec![*target],
            _ => Vec::new(),
        }
    }

    pub(super) fn field_type(&self, tag: Tag) -> Option<FieldType> {
        self.metadata.field_type(tag)
    }

    pub(super) fn is_owning(&self, tag: Tag) -> bool {
        self.metadata.is_owning(tag)
    }

    /// Writes a value, keeping the ownership index in step with Owner
    /// properties and recording an action if asked to.
    pub(super) fn put(&mut self, key: PropertyKey, value: CacheValue, record: bool) -> Result<()> {
        if key.tag == 0 {
            return Err(CacheError::InvalidArgument(format!(
                "property tag must be non-zero for key {}",
                key
            )));
        }
        if key.tag == OWNER_TAG && key.ws.is_none() {
            self.reindex_owner(key.hvo, value.as_int().unwrap_or(0));
        }
        let recorded = (record && self.action_handler.is_some()).then(|| value.clone());
        let old = self.store.set(key, value)?;
        if let Some(new) = recorded {
            self.record(PropertyAction::new(key, old, Some(new)));
        }
        Ok(())
    }

    /// Removes a value; the counterpart of [`ObjectCache::put`].
    pub(super) fn take(&mut self, key: &PropertyKey, record: bool) -> Option<CacheValue> {
        let old = self.store.remove(key)?;
        if key.tag == OWNER_TAG && key.ws.is_none() {
            if let Some(owner) = old.as_int() {
                self.unindex(key.hvo, owner);
            }
        }
        if record && self.action_handler.is_some() {
            self.record(PropertyAction::new(*key, Some(old.clone()), None));
        }
        Some(old)
    }

    fn record(&mut self, action: PropertyAction) {
        if action.is_noop() {
            return;
        }
        if let Some(handler) = self.action_handler.as_mut() {
            handler.add_action(action);
        }
    }

    fn reindex_owner(&mut self, child: Hvo, new_owner: Hvo) {
        let old_owner = self.raw_int(child, OWNER_TAG);
        if old_owner == new_owner {
            return;
        }
        self.unindex(child, old_owner);
        if new_owner != 0 {
            self.owned.entry(new_owner).or_default().insert(child);
        }
    }

    fn unindex(&mut self, child: Hvo, owner: Hvo) {
        if owner == 0 {
            return;
        }
        if let Some(children) = self.owned.get_mut(&owner) {
            children.remove(&child);
            if children.is_empty() {
                self.owned.remove(&owner);
            }
        }
    }

    pub(super) fn notify(&self, change: PropChange) {
        self.notifier.notify_all(&change);
    }

    /// Stamps Owner, OwnFlid and OwnOrd on `child`.
    pub(super) fn stamp_owner(&mut self, child: Hvo, owner: Hvo, tag: Tag, ordinal: i32) -> Result<()> {
        self.put(PropertyKey::new(child, OWNER_TAG), CacheValue::Int(owner), true)?;
        self.put(PropertyKey::new(child, OWN_FLID_TAG), CacheValue::Int(tag), true)?;
        self.put(PropertyKey::new(child, OWN_ORD_TAG), CacheValue::Int(ordinal), true)?;
        debug!(child, owner, tag, ordinal, "stamped ownership");
        Ok(())
    }

    pub(super) fn raw_int(&self, hvo: Hvo, tag: Tag) -> i32 {
        self.store
            .peek(&PropertyKey::new(hvo, tag))
            .and_then(CacheValue::as_int)
            .unwrap_or(0)
    }

    pub(super) fn raw_vec(&self, hvo: Hvo, tag: Tag) -> Vec<Hvo> {
        self.store
            .peek(&PropertyKey::new(hvo, tag))
            .and_then(CacheValue::as_vector)
            .map(<[Hvo]>::to_vec)
            .unwrap_or_default()
    }

    /// Objects owned by `hvo`: targets of its cached owning properties first,
    /// then any others the ownership index knows about. Targets whose Owner
    /// stamp names another object are not counted.
    pub(super) fn owned_children(&self, hvo: Hvo) -> Vec<Hvo> {
        let mut children = Vec::new();
        for key in self.store.keys_for_object(hvo) {
            if key.ws.is_some() || !self.is_owning(key.tag) {
                continue;
            }
            if let Some(value) = self.store.peek(&key) {
                children.extend(value.referenced_objects().into_iter().filter(|child| {
                    let stamped = self.raw_int(*child, OWNER_TAG);
                    stamped == 0 || stamped == hvo
                }));
            }
        }
        if let Some(indexed) = self.owned.get(&hvo) {
            for child in indexed {
                if !children.contains(child) {
                    children.push(*child);
                }
            }
        }
        children
    }
}

impl fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache")
            .field("entries", &self.store.len())
            .field("dirty", &self.store.is_dirty())
            .field("ids", &self.ids)
            .field("listeners", &self.notifier.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

pub(super) fn check_hvo(hvo: Hvo) -> Result<()> {
    if hvo == 0 {
        Err(CacheError::InvalidArgument("object id must be non-zero".to_string()))
    } else {
        Ok(())
    }
}

pub(super) fn check_tag(tag: Tag) -> Result<()> {
    if tag == 0 {
        Err(CacheError::InvalidArgument("property tag must be non-zero".to_string()))
    } else {
        Ok(())
    }
}
