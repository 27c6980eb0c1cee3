//! Single-flight load-through cache.
//!
//! [`FillingCache`] answers `get` from an LRU of load slots; on a miss the
//! user-supplied loader runs exactly once per missing key, while concurrent
//! callers for the same key park on the slot until the result lands. All
//! waiters receive the same result, including loader errors, which stay
//! cached until the expiry instant the loader returned.
//!
//! The loader runs without the cache lock held, so slow loads for one key
//! never block lookups of other keys.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::error::{ConfigError, LoaderError};
use crate::policy::lru::LruCore;
use crate::traits::Policy;

/// Loader invoked on a miss. Returns the value-or-error for the key plus
/// the instant the result stops being servable from cache.
pub type Loader<K, V> = Box<dyn Fn(&K) -> (Result<V, LoaderError>, Instant) + Send + Sync>;

enum SlotState<V> {
    Pending,
    Done {
        result: Result<V, LoaderError>,
        expires_at: Instant,
    },
}

struct LoadSlot<V> {
    state: Mutex<SlotState<V>>,
    ready: Condvar,
}

impl<V> LoadSlot<V> {
    fn pending() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        })
    }
}

/// Thread-safe LRU cache that computes missing values through a loader,
/// coalescing concurrent loads of the same key.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
/// use lrukit::fill::FillingCache;
///
/// let cache = FillingCache::new(100, Box::new(|key: &u64| {
///     (Ok(key * 2), Instant::now() + Duration::from_secs(60))
/// }))
/// .unwrap();
///
/// assert_eq!(cache.get(&21), Ok(42));
/// ```
pub struct FillingCache<K, V> {
    slots: Mutex<LruCore<K, Arc<LoadSlot<V>>>>,
    loader: Loader<K, V>,
}

impl<K, V> FillingCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a filling cache of the given capacity.
    pub fn new(capacity: usize, loader: Loader<K, V>) -> Result<Self, ConfigError> {
        Ok(Self {
            slots: Mutex::new(LruCore::new(capacity)?),
            loader,
        })
    }

    /// Returns the cached value for `key`, loading it on a miss.
    ///
    /// Concurrent callers for the same missing key coalesce onto a single
    /// loader invocation and all receive its result. An expired slot is
    /// reloaded by whichever caller observes the expiry first; late waiters
    /// on an expired slot retry.
    pub fn get(&self, key: &K) -> Result<V, LoaderError> {
        loop {
            let (slot, is_loader) = {
                let mut slots = self.slots.lock();
                match slots.get(key) {
                    Some(slot) => (Arc::clone(slot), false),
                    None => {
                        let slot = LoadSlot::pending();
                        slots.add(key.clone(), Arc::clone(&slot));
                        (slot, true)
                    }
                }
            };

            if is_loader {
                let (result, expires_at) = (self.loader)(key);
                let mut state = slot.state.lock();
                *state = SlotState::Done {
                    result: result.clone(),
                    expires_at,
                };
                slot.ready.notify_all();
                return result;
            }

            {
                let mut state = slot.state.lock();
                while matches!(*state, SlotState::Pending) {
                    slot.ready.wait(&mut state);
                }
                if let SlotState::Done { result, expires_at } = &*state {
                    if *expires_at > Instant::now() {
                        return result.clone();
                    }
                }
            }

            // The slot is stale. Retire it if it is still the resident one,
            // then retry as a fresh miss.
            {
                let mut slots = self.slots.lock();
                if let Some(current) = slots.peek(key) {
                    if Arc::ptr_eq(current, &slot) {
                        slots.remove(key);
                    }
                }
            }
        }
    }

    /// Number of slots currently resident (including in-flight loads).
    pub fn len(&self) -> usize {
        Policy::len(&*self.slots.lock())
    }

    /// Returns `true` if no slots are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached slot. In-flight loads still complete for their
    /// waiters.
    pub fn purge(&self) {
        self.slots.lock().purge();
    }
}

impl<K, V> std::fmt::Debug for FillingCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("FillingCache")
            .field("len", &Policy::len(&*slots))
            .field("cap", &Policy::capacity(&*slots))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    fn far_future() -> Instant {
        Instant::now() + Duration::from_secs(3600)
    }

    #[test]
    fn miss_loads_and_hit_reuses() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = FillingCache::new(
            10,
            Box::new(move |key: &u64| {
                counter.fetch_add(1, Ordering::SeqCst);
                (Ok(key * 2), far_future())
            }),
        )
        .unwrap();

        assert_eq!(cache.get(&3), Ok(6));
        assert_eq!(cache.get(&3), Ok(6));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_misses_coalesce_onto_one_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = Arc::new(
            FillingCache::new(
                10,
                Box::new(move |key: &u64| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    // Hold the load open long enough for waiters to pile up.
                    std::thread::sleep(Duration::from_millis(100));
                    (Ok(*key + 1), far_future())
                }),
            )
            .unwrap(),
        );

        let barrier = Arc::new(Barrier::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                cache.get(&7)
            }));
        }
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Ok(8));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn loader_errors_are_shared_and_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = FillingCache::<u64, u64>::new(
            10,
            Box::new(move |_key| {
                counter.fetch_add(1, Ordering::SeqCst);
                (Err(LoaderError::new("backend down")), far_future())
            }),
        )
        .unwrap();

        let err = cache.get(&1).unwrap_err();
        assert_eq!(err, LoaderError::new("backend down"));
        // The error is cached until its expiry; no second load.
        let err = cache.get(&1).unwrap_err();
        assert_eq!(err, LoaderError::new("backend down"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_slot_is_reloaded() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = FillingCache::new(
            10,
            Box::new(move |key: &u64| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                // First result is already expired when it lands.
                let expires = if n == 0 {
                    Instant::now() - Duration::from_secs(1)
                } else {
                    far_future()
                };
                (Ok(*key + n as u64), expires)
            }),
        )
        .unwrap();

        // The loading caller gets the first result as computed...
        assert_eq!(cache.get(&10), Ok(10));
        // ...but the next caller observes the expiry and reloads.
        assert_eq!(cache.get(&10), Ok(11));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn eviction_does_not_break_inflight_waiters() {
        let cache = Arc::new(
            FillingCache::new(
                1,
                Box::new(move |key: &u64| {
                    std::thread::sleep(Duration::from_millis(50));
                    (Ok(*key), far_future())
                }),
            )
            .unwrap(),
        );

        let slow = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.get(&1))
        };
        std::thread::sleep(Duration::from_millis(10));
        // Capacity 1: this load evicts key 1's slot while it is in flight.
        assert_eq!(cache.get(&2), Ok(2));
        assert_eq!(slow.join().unwrap(), Ok(1));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = FillingCache::<u64, u64>::new(0, Box::new(|_| unreachable!()));
        assert!(result.is_err());
    }
}
