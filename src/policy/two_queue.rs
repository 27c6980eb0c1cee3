//! 2Q eviction policy.
//!
//! Tracks recently and frequently used entries in separate queues so a burst
//! of one-shot keys cannot flush the frequently used set. New keys enter the
//! `recent` queue; a second touch promotes them to `frequent`. Keys evicted
//! from `recent` leave a ghost behind, and a ghost hit re-admits the key
//! directly into `frequent`. Computationally about 2x an LRU for the same
//! capacity, with ghost-key metadata on top; ARC is the self-tuning
//! alternative.

use std::hash::Hash;

use crate::ds::{GhostList, KeyedDeque};
use crate::error::ConfigError;
use crate::traits::{AddOutcome, Policy};

/// Fraction of the capacity reserved for entries seen only once.
pub const DEFAULT_RECENT_RATIO: f64 = 0.25;

/// Fraction of the capacity used to remember recently evicted keys.
pub const DEFAULT_GHOST_RATIO: f64 = 0.50;

/// Core 2Q cache. Not thread-safe; wrap in
/// [`Cache`](crate::cache::Cache) for concurrent use.
///
/// # Example
///
/// ```
/// use lrukit::policy::two_queue::TwoQueueCore;
/// use lrukit::traits::Policy;
///
/// let mut cache = TwoQueueCore::new(100).unwrap();
/// cache.add("a", 1);
/// // A hit promotes "a" from the recent queue to the frequent queue.
/// assert_eq!(cache.get(&"a"), Some(&1));
/// assert_eq!(cache.len(), 1);
/// ```
#[derive(Debug)]
pub struct TwoQueueCore<K, V> {
    recent: KeyedDeque<K, V>,
    frequent: KeyedDeque<K, V>,
    ghost: GhostList<K>,
    capacity: usize,
    recent_target: usize,
    recent_ratio: f64,
    ghost_ratio: f64,
}

impl<K, V> TwoQueueCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a 2Q cache with the default ratios.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_ratios(capacity, DEFAULT_RECENT_RATIO, DEFAULT_GHOST_RATIO)
    }

    /// Creates a 2Q cache with explicit recent/ghost ratios, both in
    /// `[0.0, 1.0]`.
    pub fn with_ratios(
        capacity: usize,
        recent_ratio: f64,
        ghost_ratio: f64,
    ) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        if !(0.0..=1.0).contains(&recent_ratio) {
            return Err(ConfigError::InvalidParameter("recent ratio"));
        }
        if !(0.0..=1.0).contains(&ghost_ratio) {
            return Err(ConfigError::InvalidParameter("ghost ratio"));
        }

        let recent_target = (capacity as f64 * recent_ratio) as usize;
        let ghost_size = (capacity as f64 * ghost_ratio) as usize;

        Ok(Self {
            recent: KeyedDeque::new(),
            frequent: KeyedDeque::with_capacity(capacity),
            ghost: GhostList::new(ghost_size),
            capacity,
            recent_target,
            recent_ratio,
            ghost_ratio,
        })
    }

    /// Number of entries in the recent (seen once) queue.
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Number of entries in the frequent queue.
    pub fn frequent_len(&self) -> usize {
        self.frequent.len()
    }

    /// Number of ghost keys remembered from recent-queue evictions.
    pub fn ghost_len(&self) -> usize {
        self.ghost.len()
    }

    /// Evicts one resident if the cache is full.
    ///
    /// The recent queue gives up its oldest entry when it is over its
    /// target, or exactly at it on a plain miss; a ghost-driven admission at
    /// the boundary spares the recent queue and charges the frequent queue
    /// instead. The evicted recent key is remembered as a ghost.
    fn ensure_space(&mut self, ghost_hit: bool) -> Option<(K, V)> {
        let recent_len = self.recent.len();
        if recent_len + self.frequent.len() < self.capacity {
            return None;
        }

        if recent_len > 0
            && (recent_len > self.recent_target
                || (recent_len == self.recent_target && !ghost_hit))
        {
            let (key, value) = self.recent.pop_back()?;
            self.ghost.record(key.clone());
            return Some((key, value));
        }

        if let Some(pair) = self.frequent.pop_back() {
            return Some(pair);
        }
        // Frequent is empty but the cache is full, so recent must give.
        let (key, value) = self.recent.pop_back()?;
        self.ghost.record(key.clone());
        Some((key, value))
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert!(self.recent.len() + self.frequent.len() <= self.capacity);
        assert!(self.ghost.len() <= (self.capacity as f64 * self.ghost_ratio) as usize);
        self.recent.debug_validate_invariants();
        self.frequent.debug_validate_invariants();
    }
}

impl<K, V> Policy<K, V> for TwoQueueCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn add(&mut self, key: K, value: V) -> AddOutcome<K, V> {
        // Already frequently used: refresh in place.
        if self.frequent.contains_key(&key) {
            self.frequent.replace(&key, value);
            self.frequent.touch(&key);
            return AddOutcome::Updated;
        }

        // Seen once before: this write is its second touch.
        if self.recent.contains_key(&key) {
            self.recent.remove(&key);
            self.frequent.push_front(key, value);
            return AddOutcome::Updated;
        }

        // Recently evicted: re-admit straight into the frequent queue.
        if self.ghost.contains(&key) {
            let evicted = self.ensure_space(true);
            self.ghost.remove(&key);
            self.frequent.push_front(key, value);
            return match evicted {
                Some((k, v)) => AddOutcome::Evicted(k, v),
                None => AddOutcome::Added,
            };
        }

        // Brand new key.
        let evicted = self.ensure_space(false);
        self.recent.push_front(key, value);
        match evicted {
            Some((k, v)) => AddOutcome::Evicted(k, v),
            None => AddOutcome::Added,
        }
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        if self.frequent.contains_key(key) {
            return self.frequent.get(key);
        }
        // A hit in the recent queue promotes the entry.
        if let Some(value) = self.recent.remove(key) {
            self.frequent.push_front(key.clone(), value);
            return self.frequent.peek(key);
        }
        None
    }

    fn peek(&self, key: &K) -> Option<&V> {
        self.frequent.peek(key).or_else(|| self.recent.peek(key))
    }

    fn contains(&self, key: &K) -> bool {
        self.frequent.contains_key(key) || self.recent.contains_key(key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        if let Some(value) = self.frequent.remove(key) {
            return Some(value);
        }
        if let Some(value) = self.recent.remove(key) {
            return Some(value);
        }
        self.ghost.remove(key);
        None
    }

    fn remove_oldest(&mut self) -> Option<(K, V)> {
        if !self.recent.is_empty()
            && (self.recent.len() >= self.recent_target || self.frequent.is_empty())
        {
            let (key, value) = self.recent.pop_back()?;
            self.ghost.record(key.clone());
            return Some((key, value));
        }
        if let Some(pair) = self.frequent.pop_back() {
            return Some(pair);
        }
        self.recent.pop_back()
    }

    fn get_oldest(&self) -> Option<(&K, &V)> {
        if !self.recent.is_empty()
            && (self.recent.len() >= self.recent_target || self.frequent.is_empty())
        {
            return self.recent.back();
        }
        self.frequent.back().or_else(|| self.recent.back())
    }

    fn resize(&mut self, new_cap: usize) -> Vec<(K, V)> {
        if new_cap == 0 {
            return Vec::new();
        }
        let mut evicted = Vec::new();
        while self.len() > new_cap {
            if let Some(pair) = self.remove_oldest() {
                evicted.push(pair);
            }
        }
        self.capacity = new_cap;
        self.recent_target = (new_cap as f64 * self.recent_ratio) as usize;
        self.ghost
            .set_capacity((new_cap as f64 * self.ghost_ratio) as usize);
        evicted
    }

    fn keys(&self) -> Vec<K> {
        self.frequent
            .keys_oldest_first()
            .chain(self.recent.keys_oldest_first())
            .cloned()
            .collect()
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.frequent
            .values_oldest_first()
            .chain(self.recent.values_oldest_first())
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.recent.len() + self.frequent.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn purge(&mut self) {
        self.recent.clear();
        self.frequent.clear();
        self.ghost.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_and_eviction_order() {
        let mut cache = TwoQueueCore::with_ratios(3, 0.25, 0.5).unwrap();
        let mut evicted = Vec::new();

        for k in 0..3 {
            cache.add(k, k * 10);
        }
        cache.get(&0);
        cache.get(&1);
        for k in 3..5 {
            if let AddOutcome::Evicted(key, _) = cache.add(k, k * 10) {
                evicted.push(key);
            }
        }

        assert_eq!(evicted, vec![2, 3]);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.frequent_len(), 2);
        assert_eq!(cache.recent_len(), 1);
        assert!(cache.contains(&0));
        assert!(cache.contains(&1));
        assert!(cache.contains(&4));
        cache.debug_validate_invariants();
    }

    #[test]
    fn get_promotes_recent_to_frequent() {
        let mut cache = TwoQueueCore::new(10).unwrap();
        cache.add(1, "one");
        assert_eq!(cache.recent_len(), 1);
        assert_eq!(cache.frequent_len(), 0);

        assert_eq!(cache.get(&1), Some(&"one"));
        assert_eq!(cache.recent_len(), 0);
        assert_eq!(cache.frequent_len(), 1);
    }

    #[test]
    fn add_of_recent_key_promotes() {
        let mut cache = TwoQueueCore::new(10).unwrap();
        cache.add(1, "one");
        assert_eq!(cache.add(1, "ONE"), AddOutcome::Updated);
        assert_eq!(cache.frequent_len(), 1);
        assert_eq!(cache.peek(&1), Some(&"ONE"));
    }

    #[test]
    fn ghost_hit_readmits_into_frequent() {
        let mut cache = TwoQueueCore::with_ratios(4, 0.5, 1.0).unwrap();
        for k in 0..4 {
            cache.add(k, k);
        }
        // recent is over target: evicts 0 into the ghost list
        cache.add(4, 4);
        assert!(!cache.contains(&0));
        assert_eq!(cache.ghost_len(), 1);

        // ghost hit goes straight to frequent; the displaced key 1 is the
        // new ghost
        cache.add(0, 100);
        assert!(cache.contains(&0));
        assert_eq!(cache.frequent.peek(&0), Some(&100));
        assert!(!cache.ghost.contains(&0));
        assert!(cache.ghost.contains(&1));
        cache.debug_validate_invariants();
    }

    #[test]
    fn ghost_list_is_bounded() {
        let mut cache = TwoQueueCore::with_ratios(4, 0.0, 0.5).unwrap();
        for k in 0..32 {
            cache.add(k, k);
        }
        assert!(cache.ghost_len() <= 2);
        cache.debug_validate_invariants();
    }

    #[test]
    fn ghost_hit_with_full_recent_queue_still_evicts() {
        let mut cache = TwoQueueCore::with_ratios(2, 1.0, 1.0).unwrap();
        cache.add(1, "one");
        cache.add(2, "two");
        cache.add(3, "three"); // evicts 1 into the ghost list
        assert!(cache.ghost.contains(&1));

        // Ghost hit while recent sits at its target and frequent is empty:
        // recent still has to give up an entry.
        let outcome = cache.add(1, "again");
        assert!(outcome.is_eviction());
        assert_eq!(cache.len(), 2);
        cache.debug_validate_invariants();
    }

    #[test]
    fn peek_and_contains_do_not_promote() {
        let mut cache = TwoQueueCore::new(10).unwrap();
        cache.add(1, "one");
        assert_eq!(cache.peek(&1), Some(&"one"));
        assert!(cache.contains(&1));
        assert_eq!(cache.recent_len(), 1);
        assert_eq!(cache.frequent_len(), 0);
    }

    #[test]
    fn remove_is_silent_for_ghosts() {
        let mut cache = TwoQueueCore::with_ratios(2, 1.0, 1.0).unwrap();
        cache.add(1, "one");
        cache.add(2, "two");
        cache.add(3, "three");
        assert!(!cache.contains(&1));

        // 1 is only a ghost now; remove reports it as absent
        assert_eq!(cache.remove(&1), None);
        // and the ghost is gone, so a re-add lands in recent
        cache.add(1, "again");
        assert_eq!(cache.recent.peek(&1), Some(&"again"));
    }

    #[test]
    fn keys_lists_frequent_before_recent() {
        let mut cache = TwoQueueCore::new(10).unwrap();
        cache.add(1, "one");
        cache.add(2, "two");
        cache.add(3, "three");
        cache.get(&2);

        assert_eq!(cache.keys(), vec![2, 1, 3]);
        assert_eq!(cache.values(), vec!["two", "one", "three"]);
    }

    #[test]
    fn resize_recomputes_targets() {
        let mut cache = TwoQueueCore::with_ratios(8, 0.5, 0.5).unwrap();
        for k in 0..8 {
            cache.add(k, k);
        }
        let evicted = cache.resize(4);
        assert_eq!(evicted.len(), 4);
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.capacity(), 4);
        assert!(cache.ghost_len() <= 2);
        cache.debug_validate_invariants();
    }

    #[test]
    fn purge_clears_ghosts_too() {
        let mut cache = TwoQueueCore::with_ratios(2, 1.0, 1.0).unwrap();
        cache.add(1, "one");
        cache.add(2, "two");
        cache.add(3, "three");
        cache.purge();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.ghost_len(), 0);

        // No ghost memory survives: a re-add is a plain miss into recent
        cache.add(1, "one");
        assert_eq!(cache.recent_len(), 1);
        assert_eq!(cache.frequent_len(), 0);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert_eq!(
            TwoQueueCore::<u32, u32>::new(0).unwrap_err(),
            ConfigError::InvalidCapacity
        );
        assert_eq!(
            TwoQueueCore::<u32, u32>::with_ratios(4, -0.1, 0.5).unwrap_err(),
            ConfigError::InvalidParameter("recent ratio")
        );
        assert_eq!(
            TwoQueueCore::<u32, u32>::with_ratios(4, 0.25, 1.5).unwrap_err(),
            ConfigError::InvalidParameter("ghost ratio")
        );
    }
}
