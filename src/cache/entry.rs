//! Cache Entry Module
//!
//! Defines the unit of storage: key, value, timestamps and recency-list linkage.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::cache::NodeId;

// == Link State ==
/// Where an entry stands relative to the recency list.
///
/// Transitions only move forward: `New -> Existing -> Deleted`, or
/// `New -> Deleted` for an entry superseded before it was ever linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    /// Allocated by an insert, not yet linked.
    New,
    /// Linked and live; the node holds its before/after links.
    Existing(NodeId),
    /// Unlinked. Terminal.
    Deleted,
}

// == Cache Entry ==
/// A single stored key/value pair plus its bookkeeping.
///
/// `key`, `value` and `write_time` never change. A put on an existing key
/// creates a fresh entry instead of mutating this one.
#[derive(Debug)]
pub(crate) struct Entry<K, V> {
    key: K,
    value: V,
    /// Logical nanoseconds at creation
    write_time: u64,
    /// Logical nanoseconds of the last read or promotion
    access_time: AtomicU64,
    /// Only read or written by the recency list while its lock is held
    link: Mutex<Link>,
}

impl<K, V> Entry<K, V> {
    // == Constructor ==
    /// Creates a new, unlinked entry stamped with `now`.
    pub(crate) fn new(key: K, value: V, now: u64) -> Self {
        Self {
            key,
            value,
            write_time: now,
            access_time: AtomicU64::new(now),
            link: Mutex::new(Link::New),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn write_time(&self) -> u64 {
        self.write_time
    }

    pub fn access_time(&self) -> u64 {
        self.access_time.load(Ordering::Relaxed)
    }

    // == Touch ==
    /// Records an access at `now`. Never moves the access time backwards,
    /// so a reader that sampled the clock earlier cannot undo a newer touch.
    pub(crate) fn touch(&self, now: u64) {
        self.access_time.fetch_max(now, Ordering::Relaxed);
    }

    pub(crate) fn link(&self) -> Link {
        *self.link.lock()
    }

    pub(super) fn set_link(&self, link: Link) {
        *self.link.lock() = link;
    }
}
