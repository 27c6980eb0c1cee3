//! Recency-ordered key/value deque.
//!
//! Pairs an [`OrderedList`] of entries with an `FxHashMap` from key to node
//! id, so that lookup, reorder, and in-place removal are all O(1). This is
//! the resident-list building block shared by the LRU policy and the
//! resident queues of 2Q and ARC.
//!
//! Front is the most recent position, back the least recent; iterating with
//! `keys_oldest_first` yields back to front. The deque does not enforce a
//! capacity itself; owners decide when to call [`KeyedDeque::pop_back`].

use rustc_hash::FxHashMap;
use std::hash::Hash;

use crate::ds::ordered_list::OrderedList;
use crate::ds::slot_arena::SlotId;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Ordered key/value store with O(1) lookup and reorder.
#[derive(Debug)]
pub struct KeyedDeque<K, V> {
    list: OrderedList<Entry<K, V>>,
    index: FxHashMap<K, SlotId>,
}

impl<K, V> KeyedDeque<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty deque.
    pub fn new() -> Self {
        Self {
            list: OrderedList::new(),
            index: FxHashMap::default(),
        }
    }

    /// Creates an empty deque with reserved capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: OrderedList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Looks up `key` and moves it to the most recent position.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.list.move_to_front(id);
        self.list.get(id).map(|entry| &entry.value)
    }

    /// Looks up `key` without changing its position.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.list.get(id).map(|entry| &entry.value)
    }

    /// Replaces the value for `key` in place, returning the old value.
    /// Position is unchanged.
    pub fn replace(&mut self, key: &K, value: V) -> Option<V> {
        let id = *self.index.get(key)?;
        self.list
            .get_mut(id)
            .map(|entry| std::mem::replace(&mut entry.value, value))
    }

    /// Moves `key` to the most recent position; returns `false` if absent.
    pub fn touch(&mut self, key: &K) -> bool {
        match self.index.get(key) {
            Some(&id) => self.list.move_to_front(id),
            None => false,
        }
    }

    /// Inserts a new entry at the most recent position.
    ///
    /// The key must not already be present; owners check with
    /// [`contains_key`](Self::contains_key) first.
    pub fn push_front(&mut self, key: K, value: V) {
        debug_assert!(!self.index.contains_key(&key));
        let id = self.list.push_front(Entry {
            key: key.clone(),
            value,
        });
        self.index.insert(key, id);
    }

    /// Removes and returns the least recent entry.
    pub fn pop_back(&mut self) -> Option<(K, V)> {
        let entry = self.list.pop_back()?;
        self.index.remove(&entry.key);
        Some((entry.key, entry.value))
    }

    /// Removes `key`, returning its value if present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        self.list.unlink(id).map(|entry| entry.value)
    }

    /// Returns the least recent entry without removing it.
    pub fn back(&self) -> Option<(&K, &V)> {
        self.list.back().map(|entry| (&entry.key, &entry.value))
    }

    /// Iterates over keys from least to most recent.
    pub fn keys_oldest_first(&self) -> impl Iterator<Item = &K> {
        self.list.iter_oldest_first().map(|entry| &entry.key)
    }

    /// Iterates over values from least to most recent.
    pub fn values_oldest_first(&self) -> impl Iterator<Item = &V> {
        self.list.iter_oldest_first().map(|entry| &entry.value)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert_eq!(self.list.len(), self.index.len());
        for (key, &id) in &self.index {
            let entry = self.list.get(id).expect("index points at missing node");
            assert!(&entry.key == key);
        }
        self.list.debug_validate_invariants();
    }
}

impl<K, V> Default for KeyedDeque<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
