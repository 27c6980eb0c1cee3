//! Adaptive Replacement Cache (ARC) eviction policy.
//!
//! ARC balances recency against frequency without manual tuning by keeping
//! four lists and moving a target split point `p` whenever a ghost list
//! records a hit.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         ArcCore<K, V> Layout                         │
//! │                                                                      │
//! │   T1 (seen once, resident)            T2 (seen repeatedly, resident) │
//! │   ┌──────────────────────────┐        ┌──────────────────────────┐   │
//! │   │ MRU              LRU     │        │ MRU              LRU     │   │
//! │   │ [new] ◄──► ... ◄──► old  │        │ [hot] ◄──► ... ◄──► cold │   │
//! │   └───────────────────┬──────┘        └───────────────────┬──────┘   │
//! │                       │ evict                             │ evict    │
//! │                       ▼                                   ▼          │
//! │   B1 (ghost keys from T1)             B2 (ghost keys from T2)        │
//! │   ┌──────────────────────────┐        ┌──────────────────────────┐   │
//! │   │ keys only, ≤ capacity    │        │ keys only, ≤ capacity    │   │
//! │   └──────────────────────────┘        └──────────────────────────┘   │
//! │                                                                      │
//! │   p ∈ [0, capacity]: target size for T1                              │
//! │   • hit in B1 → p grows  (workload favours recency)                  │
//! │   • hit in B2 → p shrinks (workload favours frequency)               │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! | Operation   | Time   | Notes                                      |
//! |-------------|--------|--------------------------------------------|
//! | `get`       | O(1)   | T1 hit promotes to T2, T2 hit moves to MRU |
//! | `add`       | O(1)   | Ghost hits adapt `p` before admission      |
//! | `contains`  | O(1)   | Resident lists only                        |
//! | `len`       | O(1)   | T1 + T2                                    |
//!
//! A ghost hit adapts `p` by `max(1, other ghost len / this ghost len)`
//! (truncating division), then re-admits the key directly into T2. Ghost
//! trimming never surfaces as an eviction event; only resident victims do.
//!
//! ## References
//!
//! - Megiddo & Modha, "ARC: A Self-Tuning, Low Overhead Replacement Cache",
//!   FAST 2003

use std::hash::Hash;

use crate::ds::{GhostList, KeyedDeque};
use crate::error::ConfigError;
use crate::traits::{AddOutcome, Policy};

/// Core Adaptive Replacement Cache. Not thread-safe; wrap in
/// [`Cache`](crate::cache::Cache) for concurrent use.
///
/// # Example
///
/// ```
/// use lrukit::policy::arc::ArcCore;
/// use lrukit::traits::Policy;
///
/// let mut cache = ArcCore::new(100).unwrap();
/// cache.add("page1", "content1");
///
/// // First hit promotes from T1 (seen once) into T2 (seen repeatedly)
/// assert_eq!(cache.get(&"page1"), Some(&"content1"));
/// assert_eq!(cache.t2_len(), 1);
/// ```
#[derive(Debug)]
pub struct ArcCore<K, V> {
    t1: KeyedDeque<K, V>,
    t2: KeyedDeque<K, V>,
    b1: GhostList<K>,
    b2: GhostList<K>,
    p: usize,
    capacity: usize,
}

impl<K, V> ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an ARC cache with the given capacity. `p` starts at 0.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(Self {
            t1: KeyedDeque::with_capacity(capacity),
            t2: KeyedDeque::with_capacity(capacity),
            b1: GhostList::new(capacity),
            b2: GhostList::new(capacity),
            p: 0,
            capacity,
        })
    }

    /// Current value of the adaptation target `p`.
    pub fn p_value(&self) -> usize {
        self.p
    }

    /// Number of residents seen exactly once.
    pub fn t1_len(&self) -> usize {
        self.t1.len()
    }

    /// Number of residents seen more than once.
    pub fn t2_len(&self) -> usize {
        self.t2.len()
    }

    /// Number of ghost keys remembered from T1 evictions.
    pub fn b1_len(&self) -> usize {
        self.b1.len()
    }

    /// Number of ghost keys remembered from T2 evictions.
    pub fn b2_len(&self) -> usize {
        self.b2.len()
    }

    fn resident_len(&self) -> usize {
        self.t1.len() + self.t2.len()
    }

    /// Evicts one resident, preferring T1 while it is over the target `p`.
    ///
    /// A B2 ghost hit at the exact boundary also charges T1, since the
    /// workload just voted for frequency. The victim's key moves to the
    /// matching ghost list.
    fn replace(&mut self, in_b2: bool) -> Option<(K, V)> {
        let t1_len = self.t1.len();
        let from_t1 = if t1_len > 0 && (t1_len > self.p || (t1_len == self.p && in_b2)) {
            true
        } else if !self.t2.is_empty() {
            false
        } else {
            t1_len > 0
        };

        if from_t1 {
            let (key, value) = self.t1.pop_back()?;
            self.b1.record(key.clone());
            Some((key, value))
        } else {
            let (key, value) = self.t2.pop_back()?;
            self.b2.record(key.clone());
            Some((key, value))
        }
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert!(self.resident_len() <= self.capacity);
        assert!(self.p <= self.capacity);
        assert!(self.b1.len() <= self.capacity);
        assert!(self.b2.len() <= self.capacity);
        self.t1.debug_validate_invariants();
        self.t2.debug_validate_invariants();
        for key in self.t1.keys_oldest_first() {
            assert!(!self.t2.contains_key(key));
            assert!(!self.b1.contains(key));
            assert!(!self.b2.contains(key));
        }
        for key in self.t2.keys_oldest_first() {
            assert!(!self.b1.contains(key));
            assert!(!self.b2.contains(key));
        }
    }
}

impl<K, V> Policy<K, V> for ArcCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn add(&mut self, key: K, value: V) -> AddOutcome<K, V> {
        // Resident in T1: a second touch, move to T2.
        if self.t1.contains_key(&key) {
            self.t1.remove(&key);
            self.t2.push_front(key, value);
            return AddOutcome::Updated;
        }

        // Resident in T2: refresh at MRU.
        if self.t2.contains_key(&key) {
            self.t2.replace(&key, value);
            self.t2.touch(&key);
            return AddOutcome::Updated;
        }

        // Ghost hit in B1: the workload wants more recency room.
        if self.b1.contains(&key) {
            let delta = (self.b2.len() / self.b1.len()).max(1);
            self.p = (self.p + delta).min(self.capacity);

            let evicted = if self.resident_len() >= self.capacity {
                self.replace(false)
            } else {
                None
            };
            self.b1.remove(&key);
            self.t2.push_front(key, value);
            return match evicted {
                Some((k, v)) => AddOutcome::Evicted(k, v),
                None => AddOutcome::Added,
            };
        }

        // Ghost hit in B2: the workload wants more frequency room.
        if self.b2.contains(&key) {
            let delta = (self.b1.len() / self.b2.len()).max(1);
            self.p = self.p.saturating_sub(delta);

            let evicted = if self.resident_len() >= self.capacity {
                self.replace(true)
            } else {
                None
            };
            self.b2.remove(&key);
            self.t2.push_front(key, value);
            return match evicted {
                Some((k, v)) => AddOutcome::Evicted(k, v),
                None => AddOutcome::Added,
            };
        }

        // Complete miss: admit into T1, trimming ghosts to their targets.
        let evicted = if self.resident_len() >= self.capacity {
            self.replace(false)
        } else {
            None
        };
        if self.b1.len() > self.capacity - self.p {
            self.b1.pop_oldest();
        }
        if self.b2.len() > self.p {
            self.b2.pop_oldest();
        }
        self.t1.push_front(key, value);
        match evicted {
            Some((k, v)) => AddOutcome::Evicted(k, v),
            None => AddOutcome::Added,
        }
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        // T1 hit: promote to T2 MRU.
        if let Some(value) = self.t1.remove(key) {
            self.t2.push_front(key.clone(), value);
            return self.t2.peek(key);
        }
        self.t2.get(key)
    }

    fn peek(&self, key: &K) -> Option<&V> {
        self.t1.peek(key).or_else(|| self.t2.peek(key))
    }

    fn contains(&self, key: &K) -> bool {
        self.t1.contains_key(key) || self.t2.contains_key(key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        if let Some(value) = self.t1.remove(key) {
            return Some(value);
        }
        if let Some(value) = self.t2.remove(key) {
            return Some(value);
        }
        self.b1.remove(key);
        self.b2.remove(key);
        None
    }

    fn remove_oldest(&mut self) -> Option<(K, V)> {
        if self.resident_len() == 0 {
            return None;
        }
        self.replace(false)
    }

    fn get_oldest(&self) -> Option<(&K, &V)> {
        let t1_len = self.t1.len();
        if t1_len > 0 && (t1_len > self.p || self.t2.is_empty()) {
            return self.t1.back();
        }
        self.t2.back().or_else(|| self.t1.back())
    }

    fn resize(&mut self, new_cap: usize) -> Vec<(K, V)> {
        if new_cap == 0 {
            return Vec::new();
        }
        let mut evicted = Vec::new();
        while self.resident_len() > new_cap {
            if let Some(pair) = self.replace(false) {
                evicted.push(pair);
            }
        }
        self.capacity = new_cap;
        self.p = self.p.min(new_cap);
        self.b1.set_capacity(new_cap);
        self.b2.set_capacity(new_cap);
        evicted
    }

    fn keys(&self) -> Vec<K> {
        self.t2
            .keys_oldest_first()
            .chain(self.t1.keys_oldest_first())
            .cloned()
            .collect()
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.t2
            .values_oldest_first()
            .chain(self.t1.values_oldest_first())
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.resident_len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn purge(&mut self) {
        self.t1.clear();
        self.t2.clear();
        self.b1.clear();
        self.b2.clear();
        self.p = 0;
    }
}
