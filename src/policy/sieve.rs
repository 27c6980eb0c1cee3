//! SIEVE eviction policy.
//!
//! Keeps entries in insertion order and approximates LRU with a single
//! visited bit per entry and a hand cursor, so hits never reorder the list.
//! https://cachemon.github.io/SIEVE-website/
//!
//! ## Algorithm
//!
//! ```text
//!   GET(key):    set visited = true          (no list movement)
//!
//!   EVICT():     start at hand (or the back if the hand is unset)
//!     ┌─► entry.visited?
//!     │     yes: clear it, step toward the front (wrap to back at the end)
//!     │     no:  unlink entry, hand = its next-newer neighbour, done
//!     └──────────┘
//! ```
//!
//! Every visited bit the scan clears stays cleared, so an eviction touches
//! at most `2 * len` entries before terminating.
//!
//! ## Performance
//!
//! | Operation | Time    | Notes                                |
//! |-----------|---------|--------------------------------------|
//! | `get`     | O(1)    | Hash lookup + bit set                |
//! | `add`     | O(1)*   | *Amortized; eviction may sweep       |
//! | `remove`  | O(1)    | Stale hand ids re-anchor at the back |

use rustc_hash::FxHashMap;
use std::hash::Hash;

use crate::ds::{OrderedList, SlotId};
use crate::error::ConfigError;
use crate::traits::{AddOutcome, Policy};

#[derive(Debug)]
struct SieveEntry<K, V> {
    key: K,
    value: V,
    visited: bool,
}

/// Core SIEVE cache. Not thread-safe; wrap in
/// [`Cache`](crate::cache::Cache) for concurrent use.
///
/// # Example
///
/// ```
/// use lrukit::policy::sieve::SieveCore;
/// use lrukit::traits::Policy;
///
/// let mut cache = SieveCore::new(2).unwrap();
/// cache.add("a", 1);
/// cache.add("b", 2);
///
/// // Mark "a" visited: the next eviction skips it and takes "b"
/// cache.get(&"a");
/// cache.add("c", 3);
/// assert!(cache.contains(&"a"));
/// assert!(!cache.contains(&"b"));
/// ```
#[derive(Debug)]
pub struct SieveCore<K, V> {
    list: OrderedList<SieveEntry<K, V>>,
    index: FxHashMap<K, SlotId>,
    hand: Option<SlotId>,
    capacity: usize,
}

impl<K, V> SieveCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a SIEVE cache with the given capacity.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(Self {
            list: OrderedList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            hand: None,
            capacity,
        })
    }

    /// Runs one sieve scan and evicts the first unvisited entry.
    ///
    /// Visited bits are cleared as the hand passes over them. The hand is
    /// left on the next-newer neighbour of the victim.
    fn sieve_step(&mut self) -> Option<(K, V)> {
        if self.list.is_empty() {
            return None;
        }
        // A hand invalidated by an earlier remove re-anchors at the back.
        let mut cursor = self.hand.filter(|&id| self.list.contains(id));
        loop {
            let id = match cursor.or_else(|| self.list.back_id()) {
                Some(id) => id,
                None => return None,
            };
            let entry = self.list.get_mut(id)?;
            if entry.visited {
                entry.visited = false;
                cursor = self.list.newer(id);
                continue;
            }
            let next = self.list.newer(id);
            let entry = self.list.unlink(id)?;
            self.index.remove(&entry.key);
            self.hand = next;
            return Some((entry.key, entry.value));
        }
    }

    /// Id of the entry the next [`sieve_step`](Self::sieve_step) would
    /// evict, without touching any visited bits.
    fn victim_id(&self) -> Option<SlotId> {
        let start = self
            .hand
            .filter(|&id| self.list.contains(id))
            .or_else(|| self.list.back_id())?;
        let mut cursor = start;
        for _ in 0..self.list.len() {
            let entry = self.list.get(cursor)?;
            if !entry.visited {
                return Some(cursor);
            }
            cursor = match self.list.newer(cursor) {
                Some(next) => next,
                None => self.list.back_id()?,
            };
        }
        // Everything is visited; a real scan would clear the bits and come
        // back around to where it started.
        Some(start)
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert!(self.list.len() <= self.capacity);
        assert_eq!(self.list.len(), self.index.len());
        if let Some(hand) = self.hand {
            // The hand may be stale after removes, but if live it must be ours.
            if self.list.contains(hand) {
                assert!(self.list.get(hand).is_some());
            }
        }
        self.list.debug_validate_invariants();
    }
}

impl<K, V> Policy<K, V> for SieveCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn add(&mut self, key: K, value: V) -> AddOutcome<K, V> {
        if let Some(&id) = self.index.get(&key) {
            if let Some(entry) = self.list.get_mut(id) {
                entry.visited = true;
                entry.value = value;
            }
            return AddOutcome::Updated;
        }

        let evicted = if self.list.len() >= self.capacity {
            self.sieve_step()
        } else {
            None
        };

        let id = self.list.push_front(SieveEntry {
            key: key.clone(),
            value,
            visited: false,
        });
        self.index.insert(key, id);

        match evicted {
            Some((k, v)) => AddOutcome::Evicted(k, v),
            None => AddOutcome::Added,
        }
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        let entry = self.list.get_mut(id)?;
        entry.visited = true;
        Some(&self.list.get(id)?.value)
    }

    fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.list.get(id).map(|entry| &entry.value)
    }

    fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        if self.hand == Some(id) {
            self.hand = self.list.newer(id);
        }
        self.list.unlink(id).map(|entry| entry.value)
    }

    fn remove_oldest(&mut self) -> Option<(K, V)> {
        self.sieve_step()
    }

    fn get_oldest(&self) -> Option<(&K, &V)> {
        let id = self.victim_id()?;
        self.list.get(id).map(|entry| (&entry.key, &entry.value))
    }

    fn resize(&mut self, new_cap: usize) -> Vec<(K, V)> {
        if new_cap == 0 {
            return Vec::new();
        }
        let excess = self.list.len().saturating_sub(new_cap);
        let mut evicted = Vec::with_capacity(excess);
        for _ in 0..excess {
            if let Some(pair) = self.sieve_step() {
                evicted.push(pair);
            }
        }
        self.capacity = new_cap;
        evicted
    }

    fn keys(&self) -> Vec<K> {
        self.list.iter_oldest_first().map(|e| e.key.clone()).collect()
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.list
            .iter_oldest_first()
            .map(|e| e.value.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.list.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn purge(&mut self) {
        self.list.clear();
        self.index.clear();
        self.hand = None;
    }
}
