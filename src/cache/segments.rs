//! Segmented Store Module
//!
//! Sharded key -> entry map. Each segment serializes its own writes; reads
//! only take a shared lock on one segment.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::Entry;

type Segment<K, V> = RwLock<HashMap<K, Arc<Entry<K, V>>>>;

// == Segmented Map ==
/// Concurrent key -> entry map partitioned into a power-of-two number of segments.
#[derive(Debug)]
pub struct SegmentedMap<K, V> {
    segments: Box<[Segment<K, V>]>,
    hasher: RandomState,
}

impl<K, V> SegmentedMap<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty map with `segment_count` segments.
    ///
    /// `segment_count` must be a power of two; the cache validates this
    /// before constructing the map.
    pub fn new(segment_count: usize) -> Self {
        assert!(
            segment_count.is_power_of_two(),
            "segment count must be a power of two"
        );
        let segments = (0..segment_count)
            .map(|_| RwLock::new(HashMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            segments,
            hasher: RandomState::new(),
        }
    }

    fn segment(&self, key: &K) -> &Segment<K, V> {
        let hash = self.hasher.hash_one(key) as usize;
        &self.segments[hash & (self.segments.len() - 1)]
    }

    // == Lookup ==
    /// Returns the entry currently stored for `key`.
    pub fn lookup(&self, key: &K) -> Option<Arc<Entry<K, V>>> {
        self.segment(key).read().get(key).cloned()
    }

    // == Insert ==
    /// Stores a fresh entry for `key`, returning it together with whatever
    /// entry it displaced. The swap is atomic with respect to other writers
    /// on the same segment.
    pub fn insert(
        &self,
        key: K,
        value: V,
        now: u64,
    ) -> (Arc<Entry<K, V>>, Option<Arc<Entry<K, V>>>) {
        let entry = Arc::new(Entry::new(key.clone(), value, now));
        let previous = self.segment(&key).write().insert(key, Arc::clone(&entry));
        (entry, previous)
    }

    // == Remove ==
    /// Removes and returns the entry stored for `key`, if any.
    pub fn remove(&self, key: &K) -> Option<Arc<Entry<K, V>>> {
        self.segment(key).write().remove(key)
    }

    // == Remove Entry ==
    /// Removes the mapping for the entry's key only if it still points at
    /// that exact entry. Returns whether a mapping was removed.
    pub fn remove_entry(&self, entry: &Arc<Entry<K, V>>) -> bool {
        let key = entry.key();
        let mut segment = self.segment(key).write();
        match segment.get(key) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                segment.remove(key);
                true
            }
            _ => false,
        }
    }

    // == Drain ==
    /// Empties every segment, returning the removed entries.
    pub fn drain(&self) -> Vec<Arc<Entry<K, V>>> {
        let mut drained = Vec::new();
        for segment in self.segments.iter() {
            drained.extend(segment.write().drain().map(|(_, entry)| entry));
        }
        drained
    }

    // == Length ==
    /// Number of mapped keys. Not a consistent snapshot under concurrent writes.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.segments.iter().map(|s| s.read().len()).sum()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every stored entry, segment by segment.
    #[cfg(test)]
    pub(crate) fn entries(&self) -> Vec<Arc<Entry<K, V>>> {
        self.segments
            .iter()
            .flat_map(|s| s.read().values().cloned().collect::<Vec<_>>())
            .collect()
    }
}
