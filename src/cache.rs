//! Thread-safe cache facade.
//!
//! [`Cache`] wraps any policy core (plus the TTL layer) behind a single
//! `parking_lot::RwLock` and owns the eviction-callback discipline:
//!
//! ```text
//!   add ──► write lock ─► TTL check ─► policy mutation ─► buffer evicted
//!                │                                             │
//!                └── release lock ◄───────────────────────────-┘
//!                         │
//!                         └──► invoke user callback per pair, in order
//! ```
//!
//! The callback is never invoked while the lock is held, so callbacks may
//! call straight back into the cache without deadlocking. Writers buffer
//! evicted pairs into a small per-cache vector (initial capacity
//! [`DEFAULT_EVICTED_BUFFER_SIZE`]) and drain it into stack locals before
//! releasing the lock.
//!
//! When a TTL is configured the builder starts one background sweeper
//! thread. Each tick the sweeper inspects the next expiry bucket under the
//! lock, sleeps unlocked until the bucket's newest deadline has passed, then
//! removes every expired entry through the policy and reports each pair to
//! the callback. [`Cache::close`] stops the thread and is idempotent;
//! dropping the cache closes it as well.
//!
//! Read operations (`peek`, `contains`, `keys`, `values`, `len`,
//! `get_oldest`) take the shared lock; everything that can touch recency or
//! evict takes the exclusive lock. Values are returned by clone so no
//! reference can outlive the lock; callers with large values should store
//! `Arc<V>`.

use std::hash::Hash;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::expire::ExpirableCache;
use crate::policy::{ArcCore, LruCore, SieveCore, TwoQueueCore};
use crate::traits::{AddOutcome, Policy};

/// Initial capacity of the buffer that carries evicted pairs out of the
/// critical section.
pub const DEFAULT_EVICTED_BUFFER_SIZE: usize = 16;

/// Callback invoked once per evicted resident, outside the lock, in
/// eviction order.
pub type EvictCallback<K, V> = Arc<dyn Fn(K, V) + Send + Sync>;

/// The policy core a [`Cache`] was built with.
#[derive(Debug)]
pub(crate) enum Backend<K, V> {
    Lru(LruCore<K, V>),
    Sieve(SieveCore<K, V>),
    TwoQueue(TwoQueueCore<K, V>),
    Arc(ArcCore<K, V>),
}

impl<K, V> Policy<K, V> for Backend<K, V>
where
    K: Eq + Hash + Clone,
{
    fn add(&mut self, key: K, value: V) -> AddOutcome<K, V> {
        match self {
            Backend::Lru(core) => core.add(key, value),
            Backend::Sieve(core) => core.add(key, value),
            Backend::TwoQueue(core) => core.add(key, value),
            Backend::Arc(core) => core.add(key, value),
        }
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        match self {
            Backend::Lru(core) => core.get(key),
            Backend::Sieve(core) => core.get(key),
            Backend::TwoQueue(core) => core.get(key),
            Backend::Arc(core) => core.get(key),
        }
    }

    fn peek(&self, key: &K) -> Option<&V> {
        match self {
            Backend::Lru(core) => core.peek(key),
            Backend::Sieve(core) => core.peek(key),
            Backend::TwoQueue(core) => core.peek(key),
            Backend::Arc(core) => core.peek(key),
        }
    }

    fn contains(&self, key: &K) -> bool {
        match self {
            Backend::Lru(core) => core.contains(key),
            Backend::Sieve(core) => core.contains(key),
            Backend::TwoQueue(core) => core.contains(key),
            Backend::Arc(core) => core.contains(key),
        }
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        match self {
            Backend::Lru(core) => core.remove(key),
            Backend::Sieve(core) => core.remove(key),
            Backend::TwoQueue(core) => core.remove(key),
            Backend::Arc(core) => core.remove(key),
        }
    }

    fn remove_oldest(&mut self) -> Option<(K, V)> {
        match self {
            Backend::Lru(core) => core.remove_oldest(),
            Backend::Sieve(core) => core.remove_oldest(),
            Backend::TwoQueue(core) => core.remove_oldest(),
            Backend::Arc(core) => core.remove_oldest(),
        }
    }

    fn get_oldest(&self) -> Option<(&K, &V)> {
        match self {
            Backend::Lru(core) => core.get_oldest(),
            Backend::Sieve(core) => core.get_oldest(),
            Backend::TwoQueue(core) => core.get_oldest(),
            Backend::Arc(core) => core.get_oldest(),
        }
    }

    fn resize(&mut self, new_cap: usize) -> Vec<(K, V)> {
        match self {
            Backend::Lru(core) => core.resize(new_cap),
            Backend::Sieve(core) => core.resize(new_cap),
            Backend::TwoQueue(core) => core.resize(new_cap),
            Backend::Arc(core) => core.resize(new_cap),
        }
    }

    fn keys(&self) -> Vec<K> {
        match self {
            Backend::Lru(core) => core.keys(),
            Backend::Sieve(core) => core.keys(),
            Backend::TwoQueue(core) => core.keys(),
            Backend::Arc(core) => core.keys(),
        }
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        match self {
            Backend::Lru(core) => core.values(),
            Backend::Sieve(core) => core.values(),
            Backend::TwoQueue(core) => core.values(),
            Backend::Arc(core) => core.values(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Backend::Lru(core) => Policy::len(core),
            Backend::Sieve(core) => Policy::len(core),
            Backend::TwoQueue(core) => Policy::len(core),
            Backend::Arc(core) => Policy::len(core),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            Backend::Lru(core) => Policy::capacity(core),
            Backend::Sieve(core) => Policy::capacity(core),
            Backend::TwoQueue(core) => Policy::capacity(core),
            Backend::Arc(core) => Policy::capacity(core),
        }
    }

    fn purge(&mut self) {
        match self {
            Backend::Lru(core) => core.purge(),
            Backend::Sieve(core) => core.purge(),
            Backend::TwoQueue(core) => core.purge(),
            Backend::Arc(core) => core.purge(),
        }
    }
}

struct Inner<K, V> {
    cache: ExpirableCache<K, V, Backend<K, V>>,
    pending: Vec<(K, V)>,
}

struct Shared<K, V> {
    inner: RwLock<Inner<K, V>>,
    on_evict: Option<EvictCallback<K, V>>,
}

struct Sweeper {
    shutdown: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

/// Thread-safe fixed size cache over any eviction policy.
///
/// Built by [`CacheBuilder`](crate::builder::CacheBuilder).
///
/// # Example
///
/// ```
/// use lrukit::builder::{CacheBuilder, CachePolicy};
/// use lrukit::cache::Cache;
///
/// let cache: Cache<u64, String> = CacheBuilder::new(128)
///     .policy(CachePolicy::Sieve)
///     .build()
///     .unwrap();
///
/// cache.add(1, "one".to_string());
/// assert_eq!(cache.get(&1), Some("one".to_string()));
/// assert_eq!(cache.len(), 1);
/// ```
pub struct Cache<K, V> {
    shared: Arc<Shared<K, V>>,
    sweeper: Option<Sweeper>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn from_parts(
        cache: ExpirableCache<K, V, Backend<K, V>>,
        on_evict: Option<EvictCallback<K, V>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: RwLock::new(Inner {
                    cache,
                    pending: Vec::with_capacity(DEFAULT_EVICTED_BUFFER_SIZE),
                }),
                on_evict,
            }),
            sweeper: None,
        }
    }

    /// Starts the background expiry sweeper. Called by the builder when a
    /// nonzero TTL is configured.
    pub(crate) fn spawn_sweeper(&mut self)
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        if self.sweeper.is_some() {
            return;
        }
        let interval = self.shared.inner.read().cache.sweep_interval();
        let (shutdown, rx) = mpsc::channel();
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("lrukit-sweeper".to_string())
            .spawn(move || sweep_loop(shared, interval, rx))
            .expect("failed to spawn sweeper thread");
        self.sweeper = Some(Sweeper {
            shutdown,
            handle: Some(handle),
        });
    }

    fn record(&self, inner: &mut Inner<K, V>, key: K, value: V) {
        if self.shared.on_evict.is_some() {
            inner.pending.push((key, value));
        }
    }

    fn drain(inner: &mut Inner<K, V>) -> Vec<(K, V)> {
        if inner.pending.is_empty() {
            Vec::new()
        } else {
            std::mem::replace(
                &mut inner.pending,
                Vec::with_capacity(DEFAULT_EVICTED_BUFFER_SIZE),
            )
        }
    }

    fn fire(&self, pairs: Vec<(K, V)>) {
        if let Some(callback) = &self.shared.on_evict {
            for (key, value) in pairs {
                callback(key, value);
            }
        }
    }

    /// Adds a value to the cache. Returns `true` if a resident entry was
    /// evicted to make room.
    pub fn add(&self, key: K, value: V) -> bool {
        let (evicted, pairs) = {
            let mut inner = self.shared.inner.write();
            let evicted = match inner.cache.add(key, value) {
                AddOutcome::Evicted(k, v) => {
                    self.record(&mut inner, k, v);
                    true
                }
                _ => false,
            };
            (evicted, Self::drain(&mut inner))
        };
        self.fire(pairs);
        evicted
    }

    /// Looks up a key, updating its recency state.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.shared.inner.write();
        inner.cache.get(key).cloned()
    }

    /// Looks up a key without updating any policy state.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.shared.inner.read().cache.peek(key).cloned()
    }

    /// Returns `true` if the key is resident and unexpired, without
    /// updating policy state.
    pub fn contains(&self, key: &K) -> bool {
        self.shared.inner.read().cache.contains(key)
    }

    /// Removes a key. Returns `true` if it was resident; the callback
    /// receives the removed pair.
    pub fn remove(&self, key: &K) -> bool {
        let (present, pairs) = {
            let mut inner = self.shared.inner.write();
            let present = match inner.cache.remove(key) {
                Some(value) => {
                    self.record(&mut inner, key.clone(), value);
                    true
                }
                None => false,
            };
            (present, Self::drain(&mut inner))
        };
        self.fire(pairs);
        present
    }

    /// Removes and returns the policy's next eviction victim.
    pub fn remove_oldest(&self) -> Option<(K, V)> {
        let (removed, pairs) = {
            let mut inner = self.shared.inner.write();
            let removed = inner.cache.remove_oldest();
            if let Some((k, v)) = &removed {
                self.record(&mut inner, k.clone(), v.clone());
            }
            (removed, Self::drain(&mut inner))
        };
        self.fire(pairs);
        removed
    }

    /// Returns the policy's next eviction victim without removing it.
    pub fn get_oldest(&self) -> Option<(K, V)> {
        self.shared
            .inner
            .read()
            .cache
            .get_oldest()
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    /// Removes every resident entry, reporting each to the callback in
    /// eviction order.
    pub fn purge(&self) {
        let pairs = {
            let mut inner = self.shared.inner.write();
            if self.shared.on_evict.is_some() {
                while let Some((k, v)) = inner.cache.remove_oldest() {
                    inner.pending.push((k, v));
                }
            }
            inner.cache.purge();
            Self::drain(&mut inner)
        };
        self.fire(pairs);
    }

    /// Changes the cache capacity, evicting oldest entries first. Returns
    /// the number of evicted entries.
    pub fn resize(&self, new_cap: usize) -> usize {
        let (count, pairs) = {
            let mut inner = self.shared.inner.write();
            let evicted = inner.cache.resize(new_cap);
            let count = evicted.len();
            if self.shared.on_evict.is_some() {
                inner.pending.extend(evicted);
            }
            (count, Self::drain(&mut inner))
        };
        self.fire(pairs);
        count
    }

    /// Returns a snapshot of the resident keys.
    ///
    /// Oldest to newest for LRU/SIEVE; frequent keys then recent keys for
    /// 2Q/ARC. Expired entries may still appear until a sweep runs.
    pub fn keys(&self) -> Vec<K> {
        self.shared.inner.read().cache.keys()
    }

    /// Returns a snapshot of the resident values, in the same order as
    /// [`keys`](Self::keys). Expired entries are omitted.
    pub fn values(&self) -> Vec<V> {
        self.shared.inner.read().cache.values()
    }

    /// Returns the number of resident entries. May briefly include expired
    /// entries the sweeper has not collected yet.
    pub fn len(&self) -> usize {
        self.shared.inner.read().cache.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the configured capacity. Zero means "no capacity bound"
    /// (TTL-only caches).
    pub fn cap(&self) -> usize {
        self.shared.inner.read().cache.capacity()
    }

    /// Stops the background sweeper, if any. Idempotent; also runs on drop.
    /// Cache operations keep working after `close`, but nothing reclaims
    /// expired entries in the background anymore.
    pub fn close(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            drop(sweeper.shutdown);
            if let Some(handle) = sweeper.handle {
                let _ = handle.join();
            }
            debug!("cache closed");
        }
    }
}

impl<K, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            drop(sweeper.shutdown);
            if let Some(handle) = sweeper.handle {
                let _ = handle.join();
            }
        }
    }
}

impl<K, V> std::fmt::Debug for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.read();
        f.debug_struct("Cache")
            .field("len", &inner.cache.len())
            .field("cap", &inner.cache.capacity())
            .field("sweeper", &self.sweeper.is_some())
            .finish_non_exhaustive()
    }
}

fn sweep_loop<K, V>(shared: Arc<Shared<K, V>>, interval: Duration, shutdown: mpsc::Receiver<()>)
where
    K: Eq + Hash + Clone,
{
    loop {
        match shutdown.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => break,
        }

        // Peek at the next bucket under the shared lock; sleep unlocked
        // until its newest deadline has passed.
        let wait = shared.inner.read().cache.sweep_wait();
        if let Some(delay) = wait {
            match shutdown.recv_timeout(delay) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => break,
            }
        }

        let expired = shared.inner.write().cache.sweep_collect();
        if expired.is_empty() {
            continue;
        }
        trace!(count = expired.len(), "sweeper collected expired entries");
        if let Some(callback) = &shared.on_evict {
            for (key, value) in expired {
                callback(key, value);
            }
        }
    }
    debug!("expiry sweeper stopped");
}

#[cfg(test)]
mod tests {
    use crate::builder::{CacheBuilder, CachePolicy};
    use crate::expire::TtlSettings;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, OnceLock};
    use std::time::Duration;

    #[test]
    fn callback_receives_evictions_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cache = CacheBuilder::new(2)
            .with_callback(move |k: u32, v: u32| sink.lock().push((k, v)))
            .build()
            .unwrap();

        cache.add(1, 10);
        cache.add(2, 20);
        cache.add(3, 30);
        assert_eq!(seen.lock().as_slice(), &[(1, 10)]);

        cache.purge();
        let order: Vec<u32> = seen.lock().iter().map(|(k, _)| *k).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn callback_can_reenter_the_cache() {
        type Slot = OnceLock<Arc<crate::cache::Cache<u32, u32>>>;
        let slot: Arc<Slot> = Arc::new(OnceLock::new());
        let reentered = Arc::new(AtomicUsize::new(0));

        let slot_in_cb = Arc::clone(&slot);
        let reentered_in_cb = Arc::clone(&reentered);
        let cache = CacheBuilder::new(2)
            .with_callback(move |_k: u32, _v: u32| {
                if let Some(cache) = slot_in_cb.get() {
                    // Deadlocks here if the eviction lock were still held.
                    let _ = cache.len();
                    let _ = cache.contains(&2);
                    reentered_in_cb.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();
        let cache = Arc::new(cache);
        let _ = slot.set(Arc::clone(&cache));

        cache.add(1, 10);
        cache.add(2, 20);
        cache.add(3, 30);
        assert_eq!(reentered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_reports_to_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cache = CacheBuilder::new(4)
            .with_callback(move |k: u32, v: u32| sink.lock().push((k, v)))
            .build()
            .unwrap();

        cache.add(1, 10);
        assert!(cache.remove(&1));
        assert!(!cache.remove(&1));
        assert_eq!(seen.lock().as_slice(), &[(1, 10)]);
    }

    #[test]
    fn resize_reports_count_and_pairs() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cache = CacheBuilder::new(4)
            .with_callback(move |k: u32, v: u32| sink.lock().push((k, v)))
            .build()
            .unwrap();

        for i in 0..4 {
            cache.add(i, i);
        }
        assert_eq!(cache.resize(2), 2);
        assert_eq!(cache.cap(), 2);
        assert_eq!(seen.lock().as_slice(), &[(0, 0), (1, 1)]);
    }

    #[test]
    fn shared_across_threads() {
        let cache: Arc<crate::cache::Cache<u64, u64>> = Arc::new(
            CacheBuilder::new(64)
                .policy(CachePolicy::Arc)
                .build()
                .unwrap(),
        );

        let mut handles = Vec::new();
        for t in 0..4u64 {
            let cache = Arc::clone(&cache);
            handles.push(std::thread::spawn(move || {
                for i in 0..500 {
                    let key = (t * 500 + i) % 96;
                    cache.add(key, key);
                    cache.get(&key);
                    cache.contains(&key);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(cache.len() <= 64);
    }

    #[test]
    fn sweeper_reclaims_expired_entries() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut cache = CacheBuilder::new(8)
            .with_ttl(TtlSettings::new(Duration::from_millis(50)))
            .with_callback(move |k: u32, v: u32| sink.lock().push((k, v)))
            .build()
            .unwrap();

        cache.add(1, 10);
        cache.add(2, 20);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while cache.len() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(cache.len(), 0);

        let mut keys: Vec<u32> = seen.lock().iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2]);

        cache.close();
        cache.close(); // idempotent
    }

    #[test]
    fn operations_work_after_close() {
        let mut cache: crate::cache::Cache<u32, u32> = CacheBuilder::new(4)
            .with_ttl(TtlSettings::new(Duration::from_secs(60)))
            .build()
            .unwrap();
        cache.close();

        cache.add(1, 10);
        assert_eq!(cache.get(&1), Some(10));
    }
}
