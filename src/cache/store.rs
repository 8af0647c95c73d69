//! Property Cache Module
//!
//! Main key/value engine: a HashMap of timestamped property values with a
//! store-wide dirty flag and a per-object key index.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};

use crate::cache::{CacheEntry, CacheSnapshot, CacheStats, CacheValue, Hvo, PropertyKey, SnapshotEntry};
use crate::error::{CacheError, Result};

// == Property Cache ==
/// Timestamped property storage keyed by (object, property[, discriminator]).
///
/// Single-threaded by design; read statistics use interior mutability so
/// lookups can take `&self`.
#[derive(Debug, Default)]
pub struct PropertyCache {
    /// Key-value storage
    entries: HashMap<PropertyKey, CacheEntry>,
    /// Keys grouped by owning object
    by_object: HashMap<Hvo, BTreeSet<PropertyKey>>,
    /// Set by every write, reset by `clear` and `clear_dirty`
    dirty: bool,
    stats: RefCell<CacheStats>,
}

impl PropertyCache {
    // == Constructor ==
    /// Creates an empty, clean cache.
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Retrieves the value stored under `key`, if any. Never fails.
    pub fn get(&self, key: &PropertyKey) -> Option<&CacheValue> {
        let found = self.entries.get(key).map(|entry| &entry.value);
        let mut stats = self.stats.borrow_mut();
        if found.is_some() {
            stats.record_hit();
        } else {
            stats.record_miss();
        }
        found
    }

    /// Looks up a value without counting it as a read.
    pub fn peek(&self, key: &PropertyKey) -> Option<&CacheValue> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    // == Set ==
    /// Stores a value, overwriting any previous one.
    ///
    /// Updates the key's timestamp and marks the cache dirty. The value is not
    /// checked against any schema here.
    ///
    /// # Returns
    /// The previous value, if the key was already present.
    ///
    /// # Errors
    /// `InvalidArgument` if the key's tag is zero.
    pub fn set(&mut self, key: PropertyKey, value: CacheValue) -> Result<Option<CacheValue>> {
        if key.tag == 0 {
            return Err(CacheError::InvalidArgument(format!(
                "property tag must be non-zero for key {}",
                key
            )));
        }

        trace!(%key, kind = ?value.kind(), "cache set");
        let previous = match self.entries.get_mut(&key) {
            Some(entry) => Some(entry.overwrite(value)),
            None => {
                self.entries.insert(key, CacheEntry::new(value));
                self.by_object.entry(key.hvo).or_default().insert(key);
                None
            }
        };

        self.dirty = true;
        self.stats.get_mut().record_write();
        Ok(previous)
    }

    // == Remove ==
    /// Removes an entry by key. No-op if absent.
    ///
    /// # Returns
    /// The removed value, if there was one.
    pub fn remove(&mut self, key: &PropertyKey) -> Option<CacheValue> {
        let removed = self.entries.remove(key)?;
        if let Some(keys) = self.by_object.get_mut(&key.hvo) {
            keys.remove(key);
            if keys.is_empty() {
                self.by_object.remove(&key.hvo);
            }
        }
        self.stats.get_mut().record_removals(1);
        trace!(%key, "cache remove");
        Some(removed.value)
    }

    // == Remove Object ==
    /// Removes every entry whose object id is `hvo`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_object(&mut self, hvo: Hvo) -> usize {
        let Some(keys) = self.by_object.remove(&hvo) else {
            return 0;
        };
        for key in &keys {
            self.entries.remove(key);
        }
        self.stats.get_mut().record_removals(keys.len());
        debug!(hvo, removed = keys.len(), "removed object entries");
        keys.len()
    }

    // == Clear ==
    /// Empties the cache, dropping all timestamps and the dirty flag.
    pub fn clear(&mut self) {
        let count = self.entries.len();
        self.entries.clear();
        self.by_object.clear();
        self.dirty = false;
        info!(removed = count, "property cache cleared");
    }

    // == Timestamp ==
    /// Returns the time of the last write to `key`.
    ///
    /// # Errors
    /// `NotFound` if the key was never written (or has been removed).
    pub fn timestamp(&self, key: &PropertyKey) -> Result<DateTime<Utc>> {
        self.entries
            .get(key)
            .map(|entry| entry.modified_at)
            .ok_or_else(|| CacheError::NotFound(format!("no timestamp recorded for {}", key)))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    pub fn contains(&self, key: &PropertyKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the keys stored for one object, in key order.
    pub fn keys_for_object(&self, hvo: Hvo) -> Vec<PropertyKey> {
        self.by_object
            .get(&hvo)
            .map(|keys| keys.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns true if any entry is stored for `hvo`.
    pub fn has_object(&self, hvo: Hvo) -> bool {
        self.by_object.contains_key(&hvo)
    }

    /// Iterates over all entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &CacheValue)> {
        self.entries.iter().map(|(key, entry)| (key, &entry.value))
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.borrow().clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Snapshot ==
    /// Captures every serializable entry. Opaque values are left out.
    pub fn snapshot(&self) -> CacheSnapshot {
        let mut entries: Vec<SnapshotEntry> = self
            .entries
            .iter()
            .filter(|(_, entry)| !matches!(entry.value, CacheValue::Opaque(_)))
            .map(|(key, entry)| SnapshotEntry {
                key: *key,
                value: entry.value.clone(),
                modified_at: entry.modified_at,
            })
            .collect();
        entries.sort_by_key(|entry| entry.key);

        let skipped = self.entries.len() - entries.len();
        if skipped > 0 {
            warn!(skipped, "opaque values left out of snapshot");
        }

        CacheSnapshot {
            entries,
            dirty: self.dirty,
            stats: self.stats(),
        }
    }

    // == Restore ==
    /// Replaces the cache contents with a snapshot, keeping its timestamps
    /// and dirty flag.
    pub fn restore(&mut self, snapshot: CacheSnapshot) -> Result<()> {
        if let Some(bad) = snapshot.entries.iter().find(|entry| entry.key.tag == 0) {
            return Err(CacheError::InvalidArgument(format!(
                "snapshot entry {} has a zero tag",
                bad.key
            )));
        }

        self.entries.clear();
        self.by_object.clear();
        for entry in snapshot.entries {
            self.by_object
                .entry(entry.key.hvo)
                .or_default()
                .insert(entry.key);
            self.entries.insert(
                entry.key,
                CacheEntry {
                    value: entry.value,
                    modified_at: entry.modified_at,
                },
            );
        }
        self.dirty = snapshot.dirty;
        info!(entries = self.entries.len(), "property cache restored from snapshot");
        Ok(())
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_new() {
        let cache = PropertyCache::new();
        assert_eq!(cache.len(), 0);
        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
    }

    #[test]
    fn test_cache_set_and_get() {
        let mut cache = PropertyCache::new();
        let key = PropertyKey::new(1, 2);

        cache.set(key, CacheValue::Int(42)).unwrap();

        assert_eq!(cache.get(&key), Some(&CacheValue::Int(42)));
        assert_eq!(cache.len(), 1);
        assert!(cache.is_dirty());
    }

    #[test]
    fn test_cache_peek_not_counted() {
        let mut cache = PropertyCache::new();
        let key = PropertyKey::new(1, 2);
        cache.set(key, CacheValue::Int(3)).unwrap();

        assert_eq!(cache.peek(&key), Some(&CacheValue::Int(3)));
        assert!(cache.peek(&PropertyKey::new(5, 5)).is_none());
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_cache_get_absent() {
        let cache = PropertyCache::new();
        assert!(cache.get(&PropertyKey::new(1, 2)).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_cache_set_zero_tag_rejected() {
        let mut cache = PropertyCache::new();
        let result = cache.set(PropertyKey::new(1, 0), CacheValue::Int(1));

        assert!(matches!(result, Err(CacheError::InvalidArgument(_))));
        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
    }

    #[test]
    fn test_cache_overwrite_returns_previous() {
        let mut cache = PropertyCache::new();
        let key = PropertyKey::new(1, 2);

        assert_eq!(cache.set(key, CacheValue::Int(1)).unwrap(), None);
        assert_eq!(
            cache.set(key, CacheValue::Unicode("x".into())).unwrap(),
            Some(CacheValue::Int(1))
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_remove() {
        let mut cache = PropertyCache::new();
        let key = PropertyKey::new(1, 2);

        cache.set(key, CacheValue::Bool(true)).unwrap();
        assert_eq!(cache.remove(&key), Some(CacheValue::Bool(true)));
        assert!(cache.is_empty());
        assert!(!cache.has_object(1));

        // Removing again is a no-op
        assert_eq!(cache.remove(&key), None);
    }

    #[test]
    fn test_cache_clear_resets_dirty_and_timestamps() {
        let mut cache = PropertyCache::new();
        let key = PropertyKey::new(1, 2);

        cache.set(key, CacheValue::Int(1)).unwrap();
        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.is_dirty());
        assert!(matches!(cache.timestamp(&key), Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_cache_clear_dirty_keeps_data() {
        let mut cache = PropertyCache::new();
        let key = PropertyKey::new(1, 2);

        cache.set(key, CacheValue::Int(1)).unwrap();
        cache.clear_dirty();

        assert!(!cache.is_dirty());
        assert_eq!(cache.get(&key), Some(&CacheValue::Int(1)));
    }

    #[test]
    fn test_cache_timestamp_advances() {
        let mut cache = PropertyCache::new();
        let key = PropertyKey::new(1, 2);

        cache.set(key, CacheValue::Int(1)).unwrap();
        let first = cache.timestamp(&key).unwrap();
        cache.set(key, CacheValue::Int(2)).unwrap();
        let second = cache.timestamp(&key).unwrap();

        assert!(second >= first);
    }

    #[test]
    fn test_cache_timestamp_never_written() {
        let cache = PropertyCache::new();
        let result = cache.timestamp(&PropertyKey::new(3, 4));
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[test]
    fn test_cache_extended_key_isolation() {
        let mut cache = PropertyCache::new();
        let plain = PropertyKey::new(1, 2);
        let extended = PropertyKey::with_ws(1, 2, 3);

        cache.set(plain, CacheValue::Unicode("A".into())).unwrap();
        cache.set(extended, CacheValue::Unicode("B".into())).unwrap();

        assert_eq!(cache.get(&plain), Some(&CacheValue::Unicode("A".into())));
        assert_eq!(cache.get(&extended), Some(&CacheValue::Unicode("B".into())));
    }

    #[test]
    fn test_cache_remove_object() {
        let mut cache = PropertyCache::new();
        cache.set(PropertyKey::new(1, 2), CacheValue::Int(1)).unwrap();
        cache.set(PropertyKey::with_ws(1, 3, 9), CacheValue::Int(2)).unwrap();
        cache.set(PropertyKey::new(2, 2), CacheValue::Int(3)).unwrap();

        assert_eq!(cache.remove_object(1), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.keys_for_object(1).is_empty());
        assert_eq!(cache.keys_for_object(2), vec![PropertyKey::new(2, 2)]);
        assert_eq!(cache.remove_object(1), 0);
    }

    #[test]
    fn test_cache_stats() {
        let mut cache = PropertyCache::new();
        let key = PropertyKey::new(1, 2);

        cache.set(key, CacheValue::Int(1)).unwrap();
        cache.get(&key);
        cache.get(&PropertyKey::new(9, 9));
        cache.remove(&key);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.removals, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_cache_snapshot_and_restore() {
        let mut cache = PropertyCache::new();
        cache.set(PropertyKey::new(1, 2), CacheValue::Int(1)).unwrap();
        cache.set(PropertyKey::new(1, 3), CacheValue::Vector(vec![4, 5])).unwrap();
        cache
            .set(
                PropertyKey::new(1, 4),
                CacheValue::Opaque(crate::cache::OpaqueRef::new(())),
            )
            .unwrap();
        let stamp = cache.timestamp(&PropertyKey::new(1, 2)).unwrap();

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.entries.len(), 2);

        let mut restored = PropertyCache::new();
        restored.restore(snapshot).unwrap();

        assert_eq!(restored.len(), 2);
        assert!(restored.is_dirty());
        assert_eq!(restored.timestamp(&PropertyKey::new(1, 2)).unwrap(), stamp);
        assert_eq!(
            restored.keys_for_object(1),
            vec![PropertyKey::new(1, 2), PropertyKey::new(1, 3)]
        );
    }
}
