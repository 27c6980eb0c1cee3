//! Bounded recency list for ghost entries.
//!
//! Tracks recently evicted keys without their values, so adaptive policies
//! (2Q, ARC) can detect re-references to keys they gave up on. Backed by an
//! [`OrderedList`] of keys plus an `FxHashMap` index for O(1) lookups.
//!
//! ```text
//!   record("d") at capacity 3:
//!     front (MRU) ─► [c] ◄──► [b] ◄──► [a] ◄─ back (LRU)
//!     1. evict "a" (oldest)
//!     2. push "d" at front
//!
//!   record("b") when present: move "b" to front, no eviction
//! ```
//!
//! A capacity of 0 creates a no-op list that ignores all records. ARC also
//! trims its ghost lists explicitly, so [`GhostList::pop_oldest`] and
//! [`GhostList::set_capacity`] are exposed alongside the automatic bound.

use rustc_hash::FxHashMap;
use std::hash::Hash;

use crate::ds::ordered_list::OrderedList;
use crate::ds::slot_arena::SlotId;

/// Bounded recency list of keys with no values.
#[derive(Debug)]
pub struct GhostList<K> {
    list: OrderedList<K>,
    index: FxHashMap<K, SlotId>,
    capacity: usize,
}

impl<K> GhostList<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a ghost list holding at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            list: OrderedList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            capacity,
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns `true` if `key` is tracked.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Records `key` at the most recent position.
    ///
    /// Re-recording a tracked key promotes it instead of duplicating it.
    /// If the list is full, the oldest key is dropped and returned.
    pub fn record(&mut self, key: K) -> Option<K> {
        if self.capacity == 0 {
            return None;
        }
        if let Some(&id) = self.index.get(&key) {
            self.list.move_to_front(id);
            return None;
        }
        let dropped = if self.list.len() >= self.capacity {
            self.pop_oldest()
        } else {
            None
        };
        let id = self.list.push_front(key.clone());
        self.index.insert(key, id);
        dropped
    }

    /// Removes `key` from the list; returns `true` if it was tracked.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(id) => self.list.unlink(id).is_some(),
            None => false,
        }
    }

    /// Removes and returns the oldest tracked key.
    pub fn pop_oldest(&mut self) -> Option<K> {
        let key = self.list.pop_back()?;
        self.index.remove(&key);
        Some(key)
    }

    /// Changes the capacity, dropping oldest keys if the list is over the
    /// new bound.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.list.len() > capacity {
            self.pop_oldest();
        }
    }

    /// Drops every tracked key.
    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert_eq!(self.list.len(), self.index.len());
        assert!(self.list.len() <= self.capacity);
        self.list.debug_validate_invariants();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_evicts_oldest_at_capacity() {
        let mut ghost = GhostList::new(3);
        assert_eq!(ghost.record("a"), None);
        assert_eq!(ghost.record("b"), None);
        assert_eq!(ghost.record("c"), None);
        assert_eq!(ghost.len(), 3);

        assert_eq!(ghost.record("d"), Some("a"));
        assert!(!ghost.contains(&"a"));
        assert!(ghost.contains(&"d"));
        assert_eq!(ghost.len(), 3);
    }

    #[test]
    fn re_record_promotes() {
        let mut ghost = GhostList::new(3);
        ghost.record("a");
        ghost.record("b");
        ghost.record("c");

        ghost.record("a");
        assert_eq!(ghost.record("d"), Some("b"));
        assert!(ghost.contains(&"a"));
        assert!(!ghost.contains(&"b"));
    }

    #[test]
    fn zero_capacity_is_noop() {
        let mut ghost = GhostList::new(0);
        assert_eq!(ghost.record("a"), None);
        assert!(ghost.is_empty());
        assert!(!ghost.contains(&"a"));
    }

    #[test]
    fn remove_and_pop_oldest() {
        let mut ghost = GhostList::new(4);
        ghost.record(1);
        ghost.record(2);
        ghost.record(3);

        assert!(ghost.remove(&2));
        assert!(!ghost.remove(&2));
        assert_eq!(ghost.pop_oldest(), Some(1));
        assert_eq!(ghost.pop_oldest(), Some(3));
        assert_eq!(ghost.pop_oldest(), None);
    }

    #[test]
    fn set_capacity_trims_oldest() {
        let mut ghost = GhostList::new(4);
        for k in 0..4 {
            ghost.record(k);
        }
        ghost.set_capacity(2);
        assert_eq!(ghost.len(), 2);
        assert!(!ghost.contains(&0));
        assert!(!ghost.contains(&1));
        assert!(ghost.contains(&2));
        assert!(ghost.contains(&3));
    }

    #[test]
    fn clear_resets_state() {
        let mut ghost = GhostList::new(2);
        ghost.record("a");
        ghost.record("b");
        ghost.clear();
        assert!(ghost.is_empty());
        assert!(!ghost.contains(&"a"));
        ghost.record("c");
        assert_eq!(ghost.len(), 1);
    }
}
