//! Recency List Module
//!
//! Global least-recently-used ordering of live entries, plus the eviction
//! engine that trims the tail.
//!
//! Nodes live in an arena and refer to each other by `NodeId`, so an entry
//! carries only the index of its node. The whole list is owned by a single
//! lock in the cache; every method here assumes that lock is held.

use std::hash::Hash;
use std::sync::Arc;

use crate::cache::{Entry, ExpirationPolicy, Link, SegmentedMap};

// == Node Id ==
/// Stable handle to a slot in the recency list arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<K, V> {
    entry: Arc<Entry<K, V>>,
    before: Option<NodeId>,
    after: Option<NodeId>,
}

// == Recency List ==
/// Doubly linked list from most recently used (head) to least (tail).
///
/// Front = Most recently used
/// Back = Least recently used
#[derive(Debug)]
pub struct RecencyList<K, V> {
    nodes: Vec<Option<Node<K, V>>>,
    /// Vacant arena slots available for reuse
    free: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    /// Number of linked (Existing) entries
    count: usize,
    /// Maximum linked entries, None = unbounded
    max_size: Option<usize>,
    policy: ExpirationPolicy,
}

impl<K, V> RecencyList<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates an empty list enforcing the given size and freshness budget.
    pub fn new(max_size: Option<usize>, policy: ExpirationPolicy) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            count: 0,
            max_size,
            policy,
        }
    }

    // == Length ==
    /// Returns the number of linked entries.
    pub fn len(&self) -> usize {
        self.count
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn node(&self, id: NodeId) -> &Node<K, V> {
        self.nodes[id.0]
            .as_ref()
            .expect("recency list references a vacant slot")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        self.nodes[id.0]
            .as_mut()
            .expect("recency list references a vacant slot")
    }

    // == Promote ==
    /// Moves `entry` to the head, linking it first if it is new, then evicts
    /// from the tail until the budget holds again.
    ///
    /// Returns the number of entries evicted, or `None` without touching the
    /// list if the entry was already deleted by someone else.
    pub fn promote(
        &mut self,
        entry: &Arc<Entry<K, V>>,
        now: u64,
        store: &SegmentedMap<K, V>,
    ) -> Option<usize> {
        match entry.link() {
            Link::Deleted => return None,
            Link::Existing(id) => self.relink_at_head(id),
            Link::New => self.link_at_head(entry),
        }
        entry.touch(now);
        Some(self.evict(now, store))
    }

    // == Evict ==
    /// Removes tail entries while the list is over capacity or the tail is
    /// expired. Returns how many entries were evicted.
    pub fn evict(&mut self, now: u64, store: &SegmentedMap<K, V>) -> usize {
        let mut evicted = 0;
        while let Some(tail) = self.tail {
            let entry = Arc::clone(&self.node(tail).entry);
            if !self.exceeds_capacity() && !self.policy.is_expired(&entry, now) {
                break;
            }
            // A newer entry for the same key may already sit in the map.
            store.remove_entry(&entry);
            self.unlink(&entry);
            evicted += 1;
        }
        evicted
    }

    fn exceeds_capacity(&self) -> bool {
        self.max_size.is_some_and(|max| self.count > max)
    }

    // == Unlink ==
    /// Detaches a linked entry and marks it deleted.
    ///
    /// Returns false (and does nothing) if the entry was not linked, so a
    /// second unlink of the same entry is harmless.
    pub fn unlink(&mut self, entry: &Entry<K, V>) -> bool {
        let Link::Existing(id) = entry.link() else {
            return false;
        };
        self.detach(id);
        self.nodes[id.0] = None;
        self.free.push(id.0);
        self.count -= 1;
        entry.set_link(Link::Deleted);
        true
    }

    // == Retire ==
    /// Retires an entry that the map no longer references.
    ///
    /// A linked entry is unlinked; a new one is marked deleted so a pending
    /// promotion can never link it. Returns whether the entry was linked.
    pub fn retire(&mut self, entry: &Entry<K, V>) -> bool {
        match entry.link() {
            Link::Existing(_) => self.unlink(entry),
            Link::New => {
                entry.set_link(Link::Deleted);
                false
            }
            Link::Deleted => false,
        }
    }

    // == Link At Head ==
    fn link_at_head(&mut self, entry: &Arc<Entry<K, V>>) {
        debug_assert_eq!(entry.link(), Link::New);
        let node = Node {
            entry: Arc::clone(entry),
            before: None,
            after: None,
        };
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };
        self.attach_at_head(id);
        self.count += 1;
        entry.set_link(Link::Existing(id));
    }

    // == Relink At Head ==
    fn relink_at_head(&mut self, id: NodeId) {
        if self.head != Some(id) {
            self.detach(id);
            self.attach_at_head(id);
        }
    }

    fn attach_at_head(&mut self, id: NodeId) {
        let old_head = self.head;
        {
            let node = self.node_mut(id);
            node.before = None;
            node.after = old_head;
        }
        match old_head {
            Some(h) => {
                let head = self.node_mut(h);
                assert!(head.before.is_none(), "head has a predecessor");
                head.before = Some(id);
            }
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    fn detach(&mut self, id: NodeId) {
        let (before, after) = {
            let node = self.node_mut(id);
            (node.before.take(), node.after.take())
        };

        match before {
            Some(b) => {
                let prev = self.node_mut(b);
                assert_eq!(prev.after, Some(id), "predecessor does not point back");
                prev.after = after;
            }
            None => {
                assert_eq!(self.head, Some(id), "unlinked node without predecessor is not head");
                self.head = after;
            }
        }

        match after {
            Some(a) => {
                let next = self.node_mut(a);
                assert_eq!(next.before, Some(id), "successor does not point back");
                next.before = before;
            }
            None => {
                assert_eq!(self.tail, Some(id), "unlinked node without successor is not tail");
                self.tail = before;
            }
        }
    }

    // == Check Invariants ==
    /// Walks the list in both directions and panics on any inconsistency.
    ///
    /// Returns the linked entries from head to tail.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Vec<Arc<Entry<K, V>>> {
        let mut forward = Vec::new();
        let mut previous = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = self.node(id);
            assert_eq!(node.before, previous, "broken before link");
            assert_eq!(node.entry.link(), Link::Existing(id), "linked entry not Existing");
            forward.push(Arc::clone(&node.entry));
            assert!(forward.len() <= self.count, "cycle in recency list");
            previous = Some(id);
            cursor = node.after;
        }
        assert_eq!(self.tail, previous, "tail is not the last node");

        let mut backward = 0;
        let mut cursor = self.tail;
        while let Some(id) = cursor {
            backward += 1;
            cursor = self.node(id).before;
        }

        let occupied = self.nodes.iter().filter(|n| n.is_some()).count();
        assert_eq!(forward.len(), self.count, "count disagrees with forward walk");
        assert_eq!(backward, self.count, "count disagrees with backward walk");
        assert_eq!(occupied, self.count, "arena holds unlinked nodes");
        forward
    }

    /// Keys from most to least recently used.
    #[cfg(test)]
    pub(crate) fn keys(&self) -> Vec<K> {
        self.check_invariants()
            .iter()
            .map(|e| e.key().clone())
            .collect()
    }
}
