//! Object Lifecycle Module
//!
//! Create, delete, move, splice and deep-copy objects inside ownership trees.
//!
//! Ordinals: a newly created object in a sequence or collection gets its
//! 1-based insertion position, and the siblings it pushes back are re-stamped
//! the same way. Moves and splices on owning vectors re-stamp every element
//! with its 0-based position in the resulting vector.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use tracing::{debug, info};
use uuid::Uuid;

use super::object_cache::{check_hvo, check_tag, ObjectCache};
use super::placement::{InsertionTarget, Placement};
use crate::cache::{CacheValue, ClassId, Hvo, PropertyKey, Tag};
use crate::error::{CacheError, Result};
use crate::metadata::{FieldType, CLASS_TAG, GUID_TAG, OWNER_TAG, OWN_FLID_TAG, OWN_ORD_TAG};
use crate::notify::PropChange;

impl ObjectCache {
    // == Create ==
    /// Creates an object of `class_id` with a fresh id and GUID.
    ///
    /// # Arguments
    /// * `class_id` - Class stamped on the new object
    /// * `placement` - Owner slot to insert into, or None for an unowned object
    ///
    /// Filling an owning atomic slot deletes its previous occupant.
    pub fn create_object(&mut self, class_id: ClassId, placement: Option<Placement>) -> Result<Hvo> {
        self.ensure_live()?;
        if let Some(placement) = &placement {
            self.check_placement(placement)?;
        }

        let hvo = self.ids.next_hvo()?;
        self.put(PropertyKey::new(hvo, GUID_TAG), CacheValue::Guid(Uuid::new_v4()), true)?;
        self.put(PropertyKey::new(hvo, CLASS_TAG), CacheValue::Int(class_id), true)?;

        if let Some(placement) = placement {
            match placement.target {
                InsertionTarget::AtomicSlot => {
                    self.stamp_owner(hvo, placement.owner, placement.tag, 0)?;
                    self.fill_atomic_slot(placement.owner, placement.tag, hvo)?;
                }
                InsertionTarget::Append | InsertionTarget::AtIndex(_) => {
                    let mut items = self.raw_vec(placement.owner, placement.tag);
                    let index = match placement.target {
                        InsertionTarget::AtIndex(index) => index,
                        _ => items.len(),
                    };
                    items.insert(index, hvo);
                    self.stamp_owner(hvo, placement.owner, placement.tag, index as i32 + 1)?;
                    self.shift_ordinals(placement.owner, placement.tag, &items, index + 1)?;
                    self.put(
                        PropertyKey::new(placement.owner, placement.tag),
                        CacheValue::Vector(items),
                        true,
                    )?;
                    self.notify(PropChange::new(placement.owner, placement.tag, index, 1, 0));
                }
            }
        }

        debug!(hvo, class_id, ?placement, "created object");
        Ok(hvo)
    }

    /// Creates a transient object with a negative id. Dummy objects are never
    /// owned and their creation is not recorded for undo.
    pub fn create_dummy_object(&mut self, class_id: ClassId) -> Result<Hvo> {
        self.ensure_live()?;
        let hvo = self.ids.next_dummy()?;
        self.put(PropertyKey::new(hvo, GUID_TAG), CacheValue::Guid(Uuid::new_v4()), false)?;
        self.put(PropertyKey::new(hvo, CLASS_TAG), CacheValue::Int(class_id), false)?;
        debug!(hvo, class_id, "created dummy object");
        Ok(hvo)
    }

    // == Delete ==
    /// Deletes an object and everything it owns.
    ///
    /// If the object's owner link is cached, it is first removed from the
    /// owner's property. Ownership is discovered from cached owning
    /// properties and from Owner stamps written through this cache.
    ///
    /// # Returns
    /// The number of objects deleted.
    pub fn delete_object(&mut self, hvo: Hvo) -> Result<usize> {
        self.ensure_live()?;
        check_hvo(hvo)?;

        let owner = self.raw_int(hvo, OWNER_TAG);
        let tag = self.raw_int(hvo, OWN_FLID_TAG);
        if owner != 0 && tag != 0 {
            self.unlink(owner, tag, hvo)?;
        }
        Ok(self.cascade_delete(hvo))
    }

    /// Removes `hvo` from `(owner, tag)` and deletes it with everything it owns.
    ///
    /// # Errors
    /// `InvalidArgument` if the property does not hold `hvo`.
    pub fn delete_owned_object(&mut self, owner: Hvo, tag: Tag, hvo: Hvo) -> Result<usize> {
        self.ensure_live()?;
        check_hvo(owner)?;
        check_hvo(hvo)?;
        check_tag(tag)?;

        if !self.unlink(owner, tag, hvo)? {
            return Err(not_held(hvo, owner, tag));
        }
        Ok(self.cascade_delete(hvo))
    }

    // == Move ==
    /// Moves `src[range]` of one vector property into another, before
    /// `dst_index`.
    ///
    /// `dst_index` counts positions in the destination after the range has
    /// been taken out of the source, which matters when both are the same
    /// property. Nothing changes if any index is out of range.
    pub fn move_owned_range(
        &mut self,
        src_owner: Hvo,
        src_tag: Tag,
        range: Range<usize>,
        dst_owner: Hvo,
        dst_tag: Tag,
        dst_index: usize,
    ) -> Result<()> {
        self.ensure_live()?;
        check_hvo(src_owner)?;
        check_hvo(dst_owner)?;
        check_tag(src_tag)?;
        check_tag(dst_tag)?;
        self.expect_vector(src_tag)?;
        self.expect_vector(dst_tag)?;

        let mut source = self.raw_vec(src_owner, src_tag);
        check_range(&range, source.len(), src_owner, src_tag)?;
        let same = src_owner == dst_owner && src_tag == dst_tag;
        let dest_len = if same {
            source.len() - range.len()
        } else {
            self.vec_len_raw(dst_owner, dst_tag)
        };
        if dst_index > dest_len {
            return Err(CacheError::InvalidArgument(format!(
                "destination index {} out of range for ({}, {}) of size {}",
                dst_index, dst_owner, dst_tag, dest_len
            )));
        }
        if range.is_empty() {
            return Ok(());
        }

        let moving: Vec<Hvo> = source.drain(range.clone()).collect();
        let count = moving.len();
        if same {
            source.splice(dst_index..dst_index, moving);
            let len = source.len();
            self.write_vector(src_owner, src_tag, source)?;
            self.notify(PropChange::new(src_owner, src_tag, 0, len, len));
        } else {
            let mut dest = self.raw_vec(dst_owner, dst_tag);
            dest.splice(dst_index..dst_index, moving);
            self.write_vector(src_owner, src_tag, source)?;
            self.write_vector(dst_owner, dst_tag, dest)?;
            self.notify(PropChange::new(src_owner, src_tag, range.start, 0, count));
            self.notify(PropChange::new(dst_owner, dst_tag, dst_index, count, 0));
        }

        debug!(src_owner, src_tag, dst_owner, dst_tag, count, "moved owned range");
        Ok(())
    }

    /// Moves one object from a vector or atomic property into another slot.
    ///
    /// # Errors
    /// `InvalidArgument` if `(src_owner, src_tag)` does not hold `hvo` or the
    /// target does not fit the destination property.
    pub fn move_owned_object(
        &mut self,
        src_owner: Hvo,
        src_tag: Tag,
        hvo: Hvo,
        dst_owner: Hvo,
        dst_tag: Tag,
        target: InsertionTarget,
    ) -> Result<()> {
        self.ensure_live()?;
        check_hvo(src_owner)?;
        check_hvo(hvo)?;
        check_tag(src_tag)?;

        let destination = Placement {
            owner: dst_owner,
            tag: dst_tag,
            target,
        };
        let source_key = PropertyKey::new(src_owner, src_tag);
        let source = self.store.peek(&source_key).cloned();

        match source {
            Some(CacheValue::Vector(items)) => {
                let index = items
                    .iter()
                    .position(|item| *item == hvo)
                    .ok_or_else(|| not_held(hvo, src_owner, src_tag))?;

                if target == InsertionTarget::AtomicSlot {
                    self.check_placement(&destination)?;
                    let mut remaining = items;
                    remaining.remove(index);
                    self.write_vector(src_owner, src_tag, remaining)?;
                    self.notify(PropChange::new(src_owner, src_tag, index, 0, 1));
                    self.stamp_owner(hvo, dst_owner, dst_tag, 0)?;
                    return self.fill_atomic_slot(dst_owner, dst_tag, hvo);
                }

                let dst_index = match target {
                    InsertionTarget::AtIndex(dst_index) => dst_index,
                    _ if src_owner == dst_owner && src_tag == dst_tag => items.len() - 1,
                    _ => self.vec_len_raw(dst_owner, dst_tag),
                };
                self.move_owned_range(src_owner, src_tag, index..index + 1, dst_owner, dst_tag, dst_index)
            }
            Some(CacheValue::Int(current)) if current == hvo => {
                self.check_placement(&destination)?;
                self.take(&source_key, true);
                self.notify(PropChange::new(src_owner, src_tag, 0, 0, 1));
                self.place_existing(hvo, destination)
            }
            _ => Err(not_held(hvo, src_owner, src_tag)),
        }
    }

    // == Replace ==
    /// Replaces `range` of a vector property with `items`.
    ///
    /// On owning properties every element of the result is re-stamped with
    /// its position, and objects that were spliced out without being put
    /// back are deleted.
    pub fn replace_vector_range(&mut self, owner: Hvo, tag: Tag, range: Range<usize>, items: &[Hvo]) -> Result<()> {
        self.ensure_live()?;
        check_hvo(owner)?;
        check_tag(tag)?;
        self.expect_vector(tag)?;

        let removed = self.splice_vector(owner, tag, range, items)?;
        if self.is_owning(tag) {
            for hvo in removed {
                if !items.contains(&hvo) && self.raw_int(hvo, OWNER_TAG) == owner {
                    self.cascade_delete(hvo);
                }
            }
        }
        Ok(())
    }

    // == Deep Copy ==
    /// Copies `source` and everything it owns into `(dest_owner, dest_tag)`.
    ///
    /// Every clone gets a fresh id and GUID. Owning properties of the clones
    /// point at the cloned children; reference properties keep pointing at
    /// the original targets. The copy goes before `insert_before` in a vector
    /// destination, or at the end if None.
    ///
    /// # Returns
    /// The id of the copied root.
    pub fn deep_copy_object(
        &mut self,
        source: Hvo,
        dest_owner: Hvo,
        dest_tag: Tag,
        insert_before: Option<Hvo>,
    ) -> Result<Hvo> {
        self.ensure_live()?;
        check_hvo(source)?;
        check_hvo(dest_owner)?;
        check_tag(dest_tag)?;
        if !self.store.has_object(source) {
            return Err(CacheError::NotFound(format!("object {} is not cached", source)));
        }

        let atomic = self
            .field_type(dest_tag)
            .is_some_and(FieldType::is_atomic_object);
        let insert_index = if atomic {
            if insert_before.is_some() {
                return Err(CacheError::InvalidArgument(format!(
                    "tag {} is atomic; cannot insert before another object",
                    dest_tag
                )));
            }
            0
        } else {
            let dest = self.raw_vec(dest_owner, dest_tag);
            match insert_before {
                Some(before) => dest
                    .iter()
                    .position(|item| *item == before)
                    .ok_or_else(|| not_held(before, dest_owner, dest_tag))?,
                None => dest.len(),
            }
        };

        // Assign ids to the whole subtree before touching the store
        let mut mapping: HashMap<Hvo, Hvo> = HashMap::new();
        let mut order = Vec::new();
        let mut pending = vec![source];
        while let Some(original) = pending.pop() {
            if mapping.contains_key(&original) {
                continue;
            }
            mapping.insert(original, self.ids.next_hvo()?);
            order.push(original);
            pending.extend(self.owned_children(original));
        }

        let mut batch = Vec::new();
        for original in &order {
            let clone = mapping[original];
            let mut has_guid = false;
            for key in self.store.keys_for_object(*original) {
                let Some(value) = self.store.peek(&key) else {
                    continue;
                };
                let value = match key.tag {
                    GUID_TAG => {
                        has_guid = true;
                        CacheValue::Guid(Uuid::new_v4())
                    }
                    OWNER_TAG if *original == source => CacheValue::Int(dest_owner),
                    OWN_FLID_TAG if *original == source => CacheValue::Int(dest_tag),
                    OWNER_TAG => remap(value, &mapping),
                    tag if key.ws.is_none() && self.is_owning(tag) => remap(value, &mapping),
                    _ => value.clone(),
                };
                batch.push((PropertyKey { hvo: clone, ..key }, value));
            }
            if !has_guid {
                batch.push((
                    PropertyKey::new(clone, GUID_TAG),
                    CacheValue::Guid(Uuid::new_v4()),
                ));
            }
        }

        let written = batch.len();
        for (key, value) in batch {
            self.put(key, value, true)?;
        }

        let root = mapping[&source];
        self.stamp_owner(root, dest_owner, dest_tag, insert_index as i32)?;
        if atomic {
            self.fill_atomic_slot(dest_owner, dest_tag, root)?;
        } else {
            self.splice_vector(dest_owner, dest_tag, insert_index..insert_index, &[root])?;
        }

        info!(source, root, objects = order.len(), entries = written, "deep-copied object");
        Ok(root)
    }

    // == Internals ==
    /// Deletes `root` and its owned subtree without touching `root`'s owner.
    pub(super) fn cascade_delete(&mut self, root: Hvo) -> usize {
        let mut pending = vec![root];
        let mut visited = HashSet::new();
        while let Some(hvo) = pending.pop() {
            if !visited.insert(hvo) {
                continue;
            }
            pending.extend(self.owned_children(hvo));
            for key in self.store.keys_for_object(hvo) {
                self.take(&key, true);
            }
            self.owned.remove(&hvo);
        }
        info!(root, deleted = visited.len(), "deleted owned subtree");
        visited.len()
    }

    /// Splices a vector property and writes it back, re-stamping owned
    /// elements. Returns the elements that were spliced out.
    fn splice_vector(&mut self, owner: Hvo, tag: Tag, range: Range<usize>, items: &[Hvo]) -> Result<Vec<Hvo>> {
        let mut vector = self.raw_vec(owner, tag);
        check_range(&range, vector.len(), owner, tag)?;

        let start = range.start;
        let removed: Vec<Hvo> = vector.splice(range, items.iter().copied()).collect();
        self.write_vector(owner, tag, vector)?;
        self.notify(PropChange::new(owner, tag, start, items.len(), removed.len()));
        Ok(removed)
    }

    /// Writes an owning vector, taking each element out of any other owner
    /// property it is still linked into before stamping it.
    fn write_vector(&mut self, owner: Hvo, tag: Tag, items: Vec<Hvo>) -> Result<()> {
        if self.is_owning(tag) {
            for (position, child) in items.iter().enumerate() {
                let previous_owner = self.raw_int(*child, OWNER_TAG);
                let previous_tag = self.raw_int(*child, OWN_FLID_TAG);
                if previous_owner != 0 && (previous_owner, previous_tag) != (owner, tag) {
                    self.unlink(previous_owner, previous_tag, *child)?;
                }
                self.stamp_owner(*child, owner, tag, position as i32)?;
            }
        }
        self.put(PropertyKey::new(owner, tag), CacheValue::Vector(items), true)
    }

    /// Re-stamps the 1-based ordinal of owned siblings from `from` onward.
    fn shift_ordinals(&mut self, owner: Hvo, tag: Tag, items: &[Hvo], from: usize) -> Result<()> {
        for (position, sibling) in items.iter().enumerate().skip(from) {
            if self.raw_int(*sibling, OWNER_TAG) == owner && self.raw_int(*sibling, OWN_FLID_TAG) == tag {
                self.put(
                    PropertyKey::new(*sibling, OWN_ORD_TAG),
                    CacheValue::Int(position as i32 + 1),
                    true,
                )?;
            }
        }
        Ok(())
    }

    /// Puts `hvo` in an atomic slot; a previous owned occupant is deleted.
    fn fill_atomic_slot(&mut self, owner: Hvo, tag: Tag, hvo: Hvo) -> Result<()> {
        let previous = self.raw_int(owner, tag);
        self.put(PropertyKey::new(owner, tag), CacheValue::Int(hvo), true)?;
        if previous != 0 && previous != hvo && self.is_owning(tag) {
            self.cascade_delete(previous);
        }
        self.notify(PropChange::new(owner, tag, 0, 1, usize::from(previous != 0)));
        Ok(())
    }

    /// Inserts an object that currently has no owner slot.
    fn place_existing(&mut self, hvo: Hvo, placement: Placement) -> Result<()> {
        match placement.target {
            InsertionTarget::AtomicSlot => {
                self.stamp_owner(hvo, placement.owner, placement.tag, 0)?;
                self.fill_atomic_slot(placement.owner, placement.tag, hvo)
            }
            InsertionTarget::Append | InsertionTarget::AtIndex(_) => {
                let index = match placement.target {
                    InsertionTarget::AtIndex(index) => index,
                    _ => self.vec_len_raw(placement.owner, placement.tag),
                };
                self.stamp_owner(hvo, placement.owner, placement.tag, index as i32)?;
                self.splice_vector(placement.owner, placement.tag, index..index, &[hvo])?;
                Ok(())
            }
        }
    }

    fn check_placement(&self, placement: &Placement) -> Result<()> {
        check_hvo(placement.owner)?;
        check_tag(placement.tag)?;
        match placement.target {
            InsertionTarget::AtomicSlot => self.expect_atomic(placement.tag),
            InsertionTarget::Append => self.expect_vector(placement.tag),
            InsertionTarget::AtIndex(index) => {
                self.expect_vector(placement.tag)?;
                let len = self.vec_len_raw(placement.owner, placement.tag);
                if index > len {
                    return Err(CacheError::InvalidArgument(format!(
                        "insertion index {} out of range for ({}, {}) of size {}",
                        index, placement.owner, placement.tag, len
                    )));
                }
                Ok(())
            }
        }
    }

    fn expect_vector(&self, tag: Tag) -> Result<()> {
        match self.field_type(tag) {
            Some(field_type) if !field_type.is_vector() => Err(CacheError::InvalidArgument(format!(
                "tag {} is {:?}, not a collection or sequence",
                tag, field_type
            ))),
            _ => Ok(()),
        }
    }

    fn expect_atomic(&self, tag: Tag) -> Result<()> {
        match self.field_type(tag) {
            Some(field_type) if !field_type.is_atomic_object() => Err(CacheError::InvalidArgument(
                format!("tag {} is {:?}, not an atomic object property", tag, field_type),
            )),
            _ => Ok(()),
        }
    }

    /// Removes `hvo` from `(owner, tag)` if it is there.
    fn unlink(&mut self, owner: Hvo, tag: Tag, hvo: Hvo) -> Result<bool> {
        let key = PropertyKey::new(owner, tag);
        match self.store.peek(&key).cloned() {
            Some(CacheValue::Vector(mut items)) => {
                let Some(index) = items.iter().position(|item| *item == hvo) else {
                    return Ok(false);
                };
                items.remove(index);
                self.put(key, CacheValue::Vector(items), true)?;
                self.notify(PropChange::new(owner, tag, index, 0, 1));
                Ok(true)
            }
            Some(CacheValue::Int(current)) if current == hvo => {
                self.take(&key, true);
                self.notify(PropChange::new(owner, tag, 0, 0, 1));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn vec_len_raw(&self, hvo: Hvo, tag: Tag) -> usize {
        self.store
            .peek(&PropertyKey::new(hvo, tag))
            .and_then(CacheValue::as_vector)
            .map_or(0, <[Hvo]>::len)
    }
}

fn remap(value: &CacheValue, mapping: &HashMap<Hvo, Hvo>) -> CacheValue {
    let map = |hvo: &Hvo| *mapping.get(hvo).unwrap_or(hvo);
    match value {
        CacheValue::Vector(items) => CacheValue::Vector(items.iter().map(map).collect()),
        CacheValue::Int(hvo) => CacheValue::Int(map(hvo)),
        other => other.clone(),
    }
}

fn check_range(range: &Range<usize>, len: usize, hvo: Hvo, tag: Tag) -> Result<()> {
    if range.start > range.end || range.end > len {
        return Err(CacheError::InvalidArgument(format!(
            "range {}..{} out of bounds for ({}, {}) of size {}",
            range.start, range.end, hvo, tag, len
        )));
    }
    Ok(())
}

fn not_held(hvo: Hvo, owner: Hvo, tag: Tag) -> CacheError {
    CacheError::InvalidArgument(format!("{} is not held by ({}, {})", hvo, owner, tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SchemaRegistry;

    const ENTRIES: Tag = 6001;
    const SENSES: Tag = 6002;
    const ETYMOLOGY: Tag = 6003;
    const SEE_ALSO: Tag = 6004;
    const GLOSS: Tag = 6005;

    fn schema() -> SchemaRegistry {
        SchemaRegistry::new()
            .with_field(ENTRIES, "Lexicon.Entries", FieldType::OwningCollection)
            .with_field(SENSES, "Entry.Senses", FieldType::OwningSequence)
            .with_field(ETYMOLOGY, "Entry.Etymology", FieldType::OwningAtomic)
            .with_field(SEE_ALSO, "Sense.SeeAlso", FieldType::ReferenceSequence)
            .with_field(GLOSS, "Sense.Gloss", FieldType::Unicode)
    }

    #[test]
    fn test_create_unowned_object() {
        let mut cache = ObjectCache::new(schema());
        let hvo = cache.create_object(5, None).unwrap();

        assert_eq!(cache.class_of(hvo).unwrap(), 5);
        assert_ne!(cache.guid_of(hvo).unwrap(), Uuid::nil());
        assert_eq!(cache.owner_of(hvo).unwrap(), 0);
    }

    #[test]
    fn test_create_ids_are_fresh() {
        let mut cache = ObjectCache::new(schema());
        let a = cache.create_object(1, None).unwrap();
        let b = cache.create_object(1, None).unwrap();
        assert!(b > a);
        assert_ne!(cache.guid_of(a).unwrap(), cache.guid_of(b).unwrap());
    }

    #[test]
    fn test_create_in_sequence_stamps_one_based_ordinal() {
        let mut cache = ObjectCache::new(schema());
        let entry = cache.create_object(1, None).unwrap();
        let first = cache.create_object(2, Some(Placement::append(entry, SENSES))).unwrap();
        let second = cache.create_object(2, Some(Placement::at(entry, SENSES, 0))).unwrap();

        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), vec![second, first]);
        assert_eq!(cache.owner_of(second).unwrap(), entry);
        assert_eq!(cache.owning_flid_of(second).unwrap(), SENSES);
        assert_eq!(cache.ordinal_of(second).unwrap(), 1);
        // Pushed back by the insertion in front of it
        assert_eq!(cache.ordinal_of(first).unwrap(), 2);
    }

    #[test]
    fn test_create_rejects_bad_placement() {
        let mut cache = ObjectCache::new(schema());
        let entry = cache.create_object(1, None).unwrap();

        assert!(matches!(
            cache.create_object(2, Some(Placement::at(entry, SENSES, 3))),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.create_object(2, Some(Placement::atomic(entry, SENSES))),
            Err(CacheError::InvalidArgument(_))
        ));
        assert!(matches!(
            cache.create_object(2, Some(Placement::append(entry, ETYMOLOGY))),
            Err(CacheError::InvalidArgument(_))
        ));
        // No id was consumed by the failed attempts
        assert_eq!(cache.create_object(1, None).unwrap(), entry + 1);
    }

    #[test]
    fn test_create_in_atomic_slot_replaces_previous() {
        let mut cache = ObjectCache::new(schema());
        let entry = cache.create_object(1, None).unwrap();
        let old = cache.create_object(3, Some(Placement::atomic(entry, ETYMOLOGY))).unwrap();
        let new = cache.create_object(3, Some(Placement::atomic(entry, ETYMOLOGY))).unwrap();

        assert_eq!(cache.obj_prop(entry, ETYMOLOGY).unwrap(), new);
        assert_eq!(cache.ordinal_of(new).unwrap(), 0);
        assert!(!cache.object_exists(old).unwrap());
    }

    #[test]
    fn test_dummy_objects() {
        let mut cache = ObjectCache::new(schema());
        let dummy = cache.create_dummy_object(9).unwrap();

        assert!(ObjectCache::is_dummy(dummy));
        assert_eq!(cache.class_of(dummy).unwrap(), 9);
        assert!(cache.create_dummy_object(9).unwrap() < dummy);
    }

    #[test]
    fn test_delete_cascades_through_owned_tree() {
        let mut cache = ObjectCache::new(schema());
        let entry = cache.create_object(1, None).unwrap();
        let sense = cache.create_object(2, Some(Placement::append(entry, SENSES))).unwrap();
        let etym = cache.create_object(3, Some(Placement::atomic(entry, ETYMOLOGY))).unwrap();
        cache.set_unicode(sense, GLOSS, "dog").unwrap();

        let deleted = cache.delete_object(entry).unwrap();

        assert_eq!(deleted, 3);
        for hvo in [entry, sense, etym] {
            assert!(cache.store().unwrap().keys_for_object(hvo).is_empty());
        }
        assert!(cache.store().unwrap().is_empty());
    }

    #[test]
    fn test_delete_does_not_follow_references() {
        let mut cache = ObjectCache::new(schema());
        let entry = cache.create_object(1, None).unwrap();
        let sense = cache.create_object(2, Some(Placement::append(entry, SENSES))).unwrap();
        let other = cache.create_object(1, None).unwrap();
        cache.cache_vec_prop(sense, SEE_ALSO, &[other]).unwrap();

        cache.delete_object(entry).unwrap();

        assert!(cache.object_exists(other).unwrap());
    }

    #[test]
    fn test_delete_unlinks_from_owner() {
        let mut cache = ObjectCache::new(schema());
        let entry = cache.create_object(1, None).unwrap();
        let a = cache.create_object(2, Some(Placement::append(entry, SENSES))).unwrap();
        let b = cache.create_object(2, Some(Placement::append(entry, SENSES))).unwrap();

        cache.delete_object(a).unwrap();

        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), vec![b]);
        assert_eq!(cache.owned_objects(entry).unwrap(), vec![b]);
    }

    #[test]
    fn test_delete_owned_object_requires_membership() {
        let mut cache = ObjectCache::new(schema());
        let entry = cache.create_object(1, None).unwrap();
        let sense = cache.create_object(2, Some(Placement::append(entry, SENSES))).unwrap();

        assert!(matches!(
            cache.delete_owned_object(entry, ENTRIES, sense),
            Err(CacheError::InvalidArgument(_))
        ));
        assert_eq!(cache.delete_owned_object(entry, SENSES, sense).unwrap(), 1);
        assert_eq!(cache.vec_size(entry, SENSES).unwrap(), 0);
    }

    #[test]
    fn test_replace_vector_range_splices() {
        let mut cache = ObjectCache::new(schema());
        cache.cache_vec_prop(1, SEE_ALSO, &[10, 20, 30, 40]).unwrap();

        cache.replace_vector_range(1, SEE_ALSO, 1..3, &[99]).unwrap();

        assert_eq!(cache.vec_prop(1, SEE_ALSO).unwrap(), vec![10, 99, 40]);
    }

    #[test]
    fn test_replace_vector_range_bounds() {
        let mut cache = ObjectCache::new(schema());
        cache.cache_vec_prop(1, SEE_ALSO, &[10, 20]).unwrap();

        assert!(matches!(
            cache.replace_vector_range(1, SEE_ALSO, 1..3, &[]),
            Err(CacheError::InvalidArgument(_))
        ));
        assert_eq!(cache.vec_prop(1, SEE_ALSO).unwrap(), vec![10, 20]);
    }

    #[test]
    fn test_replace_on_owning_restamps_and_deletes_dropped() {
        let mut cache = ObjectCache::new(schema());
        let entry = cache.create_object(1, None).unwrap();
        let a = cache.create_object(2, Some(Placement::append(entry, SENSES))).unwrap();
        let b = cache.create_object(2, Some(Placement::append(entry, SENSES))).unwrap();
        let loose = cache.create_object(2, None).unwrap();

        cache.replace_vector_range(entry, SENSES, 0..1, &[loose]).unwrap();

        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), vec![loose, b]);
        assert_eq!(cache.owner_of(loose).unwrap(), entry);
        assert_eq!(cache.ordinal_of(loose).unwrap(), 0);
        assert_eq!(cache.ordinal_of(b).unwrap(), 1);
        assert!(!cache.object_exists(a).unwrap());
    }

    #[test]
    fn test_move_owned_range_between_owners() {
        let mut cache = ObjectCache::new(schema());
        let src = cache.create_object(1, None).unwrap();
        let dst = cache.create_object(1, None).unwrap();
        let a = cache.create_object(2, Some(Placement::append(src, SENSES))).unwrap();
        let b = cache.create_object(2, Some(Placement::append(src, SENSES))).unwrap();
        let c = cache.create_object(2, Some(Placement::append(src, SENSES))).unwrap();
        let d = cache.create_object(2, Some(Placement::append(dst, SENSES))).unwrap();

        cache.move_owned_range(src, SENSES, 0..2, dst, SENSES, 1).unwrap();

        assert_eq!(cache.vec_prop(src, SENSES).unwrap(), vec![c]);
        assert_eq!(cache.vec_prop(dst, SENSES).unwrap(), vec![d, a, b]);
        assert_eq!(cache.owner_of(a).unwrap(), dst);
        assert_eq!(cache.ordinal_of(a).unwrap(), 1);
        assert_eq!(cache.ordinal_of(b).unwrap(), 2);
        assert_eq!(cache.ordinal_of(c).unwrap(), 0);
        assert_eq!(cache.owned_objects(dst).unwrap(), vec![a, b, d]);
    }

    #[test]
    fn test_move_owned_range_within_one_vector() {
        let mut cache = ObjectCache::new(schema());
        cache.cache_vec_prop(1, SEE_ALSO, &[10, 20, 30, 40]).unwrap();

        cache.move_owned_range(1, SEE_ALSO, 0..1, 1, SEE_ALSO, 3).unwrap();

        assert_eq!(cache.vec_prop(1, SEE_ALSO).unwrap(), vec![20, 30, 40, 10]);
    }

    #[test]
    fn test_move_owned_range_rejects_bad_destination() {
        let mut cache = ObjectCache::new(schema());
        cache.cache_vec_prop(1, SEE_ALSO, &[10, 20]).unwrap();
        cache.cache_vec_prop(2, SEE_ALSO, &[30]).unwrap();

        assert!(matches!(
            cache.move_owned_range(1, SEE_ALSO, 0..1, 2, SEE_ALSO, 5),
            Err(CacheError::InvalidArgument(_))
        ));
        assert_eq!(cache.vec_prop(1, SEE_ALSO).unwrap(), vec![10, 20]);
    }

    #[test]
    fn test_move_owned_object_to_front_of_sequence() {
        let mut cache = ObjectCache::new(schema());
        let src = cache.create_object(1, None).unwrap();
        let dst = cache.create_object(1, None).unwrap();
        let e = cache.create_object(2, Some(Placement::append(src, SENSES))).unwrap();
        let existing = cache.create_object(2, Some(Placement::append(dst, SENSES))).unwrap();

        cache
            .move_owned_object(src, SENSES, e, dst, SENSES, InsertionTarget::AtIndex(0))
            .unwrap();

        assert_eq!(cache.owner_of(e).unwrap(), dst);
        assert_eq!(cache.owning_flid_of(e).unwrap(), SENSES);
        assert_eq!(cache.ordinal_of(e).unwrap(), 0);
        assert_eq!(cache.vec_prop(dst, SENSES).unwrap(), vec![e, existing]);
        assert!(!cache.vec_prop(src, SENSES).unwrap().contains(&e));
    }

    #[test]
    fn test_move_owned_object_between_atomic_and_vector() {
        let mut cache = ObjectCache::new(schema());
        let a = cache.create_object(1, None).unwrap();
        let b = cache.create_object(1, None).unwrap();
        let etym = cache.create_object(3, Some(Placement::atomic(a, ETYMOLOGY))).unwrap();

        cache
            .move_owned_object(a, ETYMOLOGY, etym, b, SENSES, InsertionTarget::Append)
            .unwrap();
        assert_eq!(cache.obj_prop(a, ETYMOLOGY).unwrap(), 0);
        assert_eq!(cache.vec_prop(b, SENSES).unwrap(), vec![etym]);
        assert_eq!(cache.owner_of(etym).unwrap(), b);

        cache
            .move_owned_object(b, SENSES, etym, a, ETYMOLOGY, InsertionTarget::AtomicSlot)
            .unwrap();
        assert_eq!(cache.obj_prop(a, ETYMOLOGY).unwrap(), etym);
        assert!(cache.vec_prop(b, SENSES).unwrap().is_empty());
        assert_eq!(cache.owning_flid_of(etym).unwrap(), ETYMOLOGY);
        assert_eq!(cache.int_prop(etym, OWN_ORD_TAG).unwrap(), 0);
    }

    #[test]
    fn test_move_owned_object_not_held() {
        let mut cache = ObjectCache::new(schema());
        let a = cache.create_object(1, None).unwrap();
        let b = cache.create_object(1, None).unwrap();

        assert!(matches!(
            cache.move_owned_object(a, SENSES, 42, b, SENSES, InsertionTarget::Append),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_deep_copy_clones_owned_tree() {
        let mut cache = ObjectCache::new(schema());
        let lexicon = cache.create_object(10, None).unwrap();
        let entry = cache.create_object(1, Some(Placement::append(lexicon, ENTRIES))).unwrap();
        let sense = cache.create_object(2, Some(Placement::append(entry, SENSES))).unwrap();
        let target = cache.create_object(1, None).unwrap();
        cache.set_unicode(sense, GLOSS, "dog").unwrap();
        cache.cache_vec_prop(sense, SEE_ALSO, &[target]).unwrap();

        let copy = cache.deep_copy_object(entry, lexicon, ENTRIES, Some(entry)).unwrap();

        assert_ne!(copy, entry);
        assert_eq!(cache.vec_prop(lexicon, ENTRIES).unwrap(), vec![copy, entry]);
        assert_eq!(cache.class_of(copy).unwrap(), 1);
        assert_eq!(cache.owner_of(copy).unwrap(), lexicon);
        assert_ne!(cache.guid_of(copy).unwrap(), cache.guid_of(entry).unwrap());

        let copied_senses = cache.vec_prop(copy, SENSES).unwrap();
        assert_eq!(copied_senses.len(), 1);
        let copied_sense = copied_senses[0];
        assert_ne!(copied_sense, sense);
        assert_eq!(cache.owner_of(copied_sense).unwrap(), copy);
        assert_eq!(cache.unicode_prop(copied_sense, GLOSS).unwrap(), "dog");
        assert_eq!(cache.vec_prop(copied_sense, SEE_ALSO).unwrap(), vec![target]);

        // The original is untouched
        assert_eq!(cache.vec_prop(entry, SENSES).unwrap(), vec![sense]);
        assert_eq!(cache.owner_of(sense).unwrap(), entry);
    }

    #[test]
    fn test_deep_copy_into_atomic_slot() {
        let mut cache = ObjectCache::new(schema());
        let a = cache.create_object(1, None).unwrap();
        let b = cache.create_object(1, None).unwrap();
        let etym = cache.create_object(3, Some(Placement::atomic(a, ETYMOLOGY))).unwrap();

        let copy = cache.deep_copy_object(etym, b, ETYMOLOGY, None).unwrap();

        assert_eq!(cache.obj_prop(b, ETYMOLOGY).unwrap(), copy);
        assert_eq!(cache.owner_of(copy).unwrap(), b);
        assert_eq!(cache.obj_prop(a, ETYMOLOGY).unwrap(), etym);
        assert!(matches!(
            cache.deep_copy_object(etym, b, ETYMOLOGY, Some(a)),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_deep_copy_missing_source() {
        let mut cache = ObjectCache::new(schema());
        let owner = cache.create_object(1, None).unwrap();

        assert!(matches!(
            cache.deep_copy_object(777, owner, ENTRIES, None),
            Err(CacheError::NotFound(_))
        ));
    }

    #[test]
    fn test_replace_takes_object_from_previous_owner() {
        let mut cache = ObjectCache::new(schema());
        let a = cache.create_object(1, None).unwrap();
        let b = cache.create_object(1, None).unwrap();
        let sense = cache.create_object(2, Some(Placement::append(a, SENSES))).unwrap();

        cache.replace_vector_range(b, SENSES, 0..0, &[sense]).unwrap();

        assert_eq!(cache.owner_of(sense).unwrap(), b);
        assert!(cache.vec_prop(a, SENSES).unwrap().is_empty());
        assert_eq!(cache.vec_prop(b, SENSES).unwrap(), vec![sense]);

        cache.delete_object(a).unwrap();
        assert!(cache.object_exists(sense).unwrap());
        assert_eq!(cache.vec_prop(b, SENSES).unwrap(), vec![sense]);
    }

    #[test]
    fn test_replace_takes_object_from_atomic_slot() {
        let mut cache = ObjectCache::new(schema());
        let a = cache.create_object(1, None).unwrap();
        let b = cache.create_object(1, None).unwrap();
        let etym = cache.create_object(3, Some(Placement::atomic(a, ETYMOLOGY))).unwrap();

        cache.replace_vector_range(b, SENSES, 0..0, &[etym]).unwrap();

        assert_eq!(cache.obj_prop(a, ETYMOLOGY).unwrap(), 0);
        assert_eq!(cache.owning_flid_of(etym).unwrap(), SENSES);
        assert_eq!(cache.delete_object(a).unwrap(), 1);
        assert!(cache.object_exists(etym).unwrap());
    }

    #[test]
    fn test_cascade_skips_stale_vector_members() {
        let mut cache = ObjectCache::new(schema());
        let a = cache.create_object(1, None).unwrap();
        let b = cache.create_object(1, None).unwrap();
        let sense = cache.create_object(2, Some(Placement::append(b, SENSES))).unwrap();
        // Fixture data still lists the object under its former owner
        cache.cache_vec_prop(a, SENSES, &[sense]).unwrap();

        assert_eq!(cache.delete_object(a).unwrap(), 1);
        assert!(cache.object_exists(sense).unwrap());
    }

    #[test]
    fn test_create_fails_when_ids_run_out() {
        let mut cache = ObjectCache::new(schema());
        cache.cache_int_prop(Hvo::MAX, CLASS_TAG, 1).unwrap();

        assert_eq!(cache.class_of(Hvo::MAX).unwrap(), 1);
        assert!(matches!(
            cache.create_object(1, None),
            Err(CacheError::InvalidArgument(_))
        ));
    }
}
