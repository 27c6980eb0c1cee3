//! # Eviction Policy Contract
//!
//! This module defines the single trait shared by every eviction policy in
//! the library, so that wrappers (TTL, thread-safety, filling) and the cache
//! builder can compose any policy without knowing which one they hold.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌───────────────────────────────────────────┐
//!                    │              Policy<K, V>                 │
//!                    │                                           │
//!                    │  add(K, V)        → AddOutcome<K, V>      │
//!                    │  get(&K)          → Option<&V>  (touches) │
//!                    │  peek / contains  → no state change       │
//!                    │  remove(&K)       → Option<V>             │
//!                    │  remove_oldest()  → Option<(K, V)>        │
//!                    │  resize(n)        → Vec<(K, V)> evicted   │
//!                    │  keys / values    → snapshots             │
//!                    └──────────┬────────────────────────────────┘
//!                               │ implemented by
//!          ┌────────────┬───────┴──────┬──────────────┐
//!          ▼            ▼              ▼              ▼
//!      LruCore      SieveCore    TwoQueueCore      ArcCore
//! ```
//!
//! ## Ordering Guarantees
//!
//! | Operation       | LRU / SIEVE             | 2Q / ARC                        |
//! |-----------------|-------------------------|---------------------------------|
//! | `keys()`        | oldest → newest         | frequent keys, then recent keys |
//! | `values()`      | same order as `keys()`  | same order as `keys()`          |
//! | `remove_oldest` | back of list / hand scan| policy victim selection         |
//!
//! `get` updates recency (or the SIEVE visited bit); `peek` and `contains`
//! never change what a subsequent `keys()` returns.
//!
//! ## Failure Semantics
//!
//! Constructors validate capacity and ratios and return
//! [`ConfigError`](crate::error::ConfigError). Trait operations cannot fail:
//! `get` on a missing key is `None`, `remove` on a missing key is `None`,
//! `purge` and `resize` always succeed.

use std::hash::Hash;

/// Result of a single [`Policy::add`] call.
///
/// At most one resident entry is displaced per `add`; ghost-list trimming in
/// 2Q/ARC is internal bookkeeping and never surfaces here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome<K, V> {
    /// The key was new and was inserted without displacing anything.
    Added,
    /// The key was already resident; its value was replaced in place.
    Updated,
    /// The key was inserted and the returned resident pair was evicted to
    /// make room.
    Evicted(K, V),
}

impl<K, V> AddOutcome<K, V> {
    /// Returns the evicted pair, if this outcome carries one.
    pub fn into_evicted(self) -> Option<(K, V)> {
        match self {
            AddOutcome::Evicted(k, v) => Some((k, v)),
            _ => None,
        }
    }

    /// Returns `true` if the add displaced a resident entry.
    pub fn is_eviction(&self) -> bool {
        matches!(self, AddOutcome::Evicted(_, _))
    }
}

/// Common contract implemented by every eviction policy core.
///
/// Policy cores are single-threaded; thread safety is layered on by
/// [`Cache`](crate::cache::Cache). Keys must be `Eq + Hash + Clone` because
/// ghost lists and key indexes hold copies of the key.
///
/// # Example
///
/// ```
/// use lrukit::traits::{AddOutcome, Policy};
/// use lrukit::policy::lru::LruCore;
///
/// fn warm<P: Policy<u64, String>>(cache: &mut P, data: &[(u64, String)]) {
///     for (key, value) in data {
///         cache.add(*key, value.clone());
///     }
/// }
///
/// let mut cache = LruCore::new(100).unwrap();
/// warm(&mut cache, &[(1, "one".to_string()), (2, "two".to_string())]);
/// assert_eq!(cache.len(), 2);
/// assert_eq!(cache.add(1, "ONE".to_string()), AddOutcome::Updated);
/// ```
pub trait Policy<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Inserts or updates a key, evicting at most one resident entry.
    fn add(&mut self, key: K, value: V) -> AddOutcome<K, V>;

    /// Looks up a key and updates its recency / visited state.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Looks up a key without updating any policy state.
    fn peek(&self, key: &K) -> Option<&V>;

    /// Returns `true` if the key is resident, without updating policy state.
    fn contains(&self, key: &K) -> bool;

    /// Removes a key, returning its value if it was resident.
    ///
    /// Removing a key that only exists as a ghost (2Q/ARC) returns `None`;
    /// ghost removal is not observable.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Removes and returns the policy's next eviction victim.
    fn remove_oldest(&mut self) -> Option<(K, V)>;

    /// Returns the policy's next eviction victim without removing it.
    fn get_oldest(&self) -> Option<(&K, &V)>;

    /// Shrinks or grows the capacity, evicting `max(0, len - new_cap)`
    /// entries. Returns the evicted pairs in eviction order.
    ///
    /// `resize(0)` is a no-op that returns an empty vector.
    fn resize(&mut self, new_cap: usize) -> Vec<(K, V)>;

    /// Returns a snapshot of the resident keys.
    ///
    /// Oldest to newest for single-list policies; frequent keys followed by
    /// recent keys for 2Q/ARC, each segment oldest to newest.
    fn keys(&self) -> Vec<K>;

    /// Returns a snapshot of the resident values, in the same order as
    /// [`keys`](Self::keys).
    fn values(&self) -> Vec<V>
    where
        V: Clone;

    /// Returns the number of resident entries.
    fn len(&self) -> usize;

    /// Returns `true` if there are no resident entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity.
    fn capacity(&self) -> usize;

    /// Drops every resident entry and all ghost/cursor state.
    fn purge(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_outcome_into_evicted() {
        let outcome: AddOutcome<u32, &str> = AddOutcome::Evicted(7, "seven");
        assert!(outcome.is_eviction());
        assert_eq!(outcome.into_evicted(), Some((7, "seven")));

        let outcome: AddOutcome<u32, &str> = AddOutcome::Added;
        assert!(!outcome.is_eviction());
        assert_eq!(outcome.into_evicted(), None);
    }
}
