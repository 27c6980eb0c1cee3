//! TTL wrapper over any eviction policy.
//!
//! [`ExpirableCache`] composes a [`Policy`] with per-entry deadlines and a
//! bucketed [`ExpiryWheel`]. Reads treat an expired entry as absent the
//! moment its deadline passes; the entry itself is reclaimed either by the
//! next write that needs room or by the sweeper draining the entry's wheel
//! bucket. `len` may therefore overcount briefly between expiry and
//! collection.
//!
//! ## Expiry anchoring
//!
//! | Mode          | Deadline resets on                     |
//! |---------------|----------------------------------------|
//! | `AfterWrite`  | insert and update only                 |
//! | `AfterAccess` | insert, update, and every successful get |
//!
//! The clock is injectable so TTL behaviour is testable without sleeping;
//! production callers leave it defaulted to `Instant::now`.
//!
//! ## Example Usage
//!
//! ```
//! use std::time::Duration;
//! use lrukit::expire::{ExpirableCache, TtlSettings};
//! use lrukit::policy::lru::LruCore;
//! use lrukit::traits::Policy;
//!
//! let lru = LruCore::new(10).unwrap();
//! let mut cache = ExpirableCache::new(lru, Some(TtlSettings::new(Duration::from_secs(30))));
//! cache.add("session", "token");
//! assert_eq!(cache.get(&"session"), Some(&"token"));
//! ```

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use crate::ds::expiry_wheel::{ExpiryWheel, WheelSlot};
use crate::traits::{AddOutcome, Policy};

/// Injectable time source. Defaults to `Instant::now`.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

/// Which operations anchor an entry's TTL deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryMode {
    /// The deadline is set on insert and update only.
    #[default]
    AfterWrite,
    /// Every successful `get` pushes the deadline out by one TTL.
    AfterAccess,
}

/// TTL configuration for [`ExpirableCache`] and
/// [`CacheBuilder::with_ttl`](crate::builder::CacheBuilder::with_ttl).
#[derive(Clone)]
pub struct TtlSettings {
    /// Entry lifetime. Zero disables expiry entirely.
    pub ttl: Duration,
    /// Deadline anchoring mode.
    pub mode: ExpiryMode,
    /// Sweeper period; defaults to `ttl / 100` when unset.
    pub sweep_interval: Option<Duration>,
    /// Time source override, for tests.
    pub clock: Option<Clock>,
}

impl TtlSettings {
    /// TTL settings with the default `AfterWrite` mode.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            mode: ExpiryMode::AfterWrite,
            sweep_interval: None,
            clock: None,
        }
    }

    /// Sets the expiry mode.
    pub fn mode(mut self, mode: ExpiryMode) -> Self {
        self.mode = mode;
        self
    }

    /// Overrides the sweep interval.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Overrides the time source.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// The sweep interval that will actually be used.
    pub fn resolved_sweep_interval(&self) -> Duration {
        self.sweep_interval.unwrap_or(self.ttl / 100)
    }
}

impl std::fmt::Debug for TtlSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlSettings")
            .field("ttl", &self.ttl)
            .field("mode", &self.mode)
            .field("sweep_interval", &self.sweep_interval)
            .field("custom_clock", &self.clock.is_some())
            .finish()
    }
}

#[derive(Debug)]
struct Deadline {
    expires_at: Instant,
    slot: WheelSlot,
}

/// Adds per-entry TTL on top of any [`Policy`].
///
/// Not thread-safe; [`Cache`](crate::cache::Cache) provides the lock and
/// runs the sweeper thread that drives [`sweep_wait`](Self::sweep_wait) /
/// [`sweep_collect`](Self::sweep_collect).
pub struct ExpirableCache<K, V, P> {
    policy: P,
    ttl: Duration,
    mode: ExpiryMode,
    sweep_every: Duration,
    clock: Clock,
    wheel: ExpiryWheel<K>,
    deadlines: FxHashMap<K, Deadline>,
    _values: std::marker::PhantomData<V>,
}

impl<K, V, P> ExpirableCache<K, V, P>
where
    K: Eq + Hash + Clone,
    P: Policy<K, V>,
{
    /// Wraps `policy`. With `settings` of `None` (or a zero TTL) the wrapper
    /// is a transparent pass-through.
    pub fn new(policy: P, settings: Option<TtlSettings>) -> Self {
        let settings = settings.unwrap_or_else(|| TtlSettings::new(Duration::ZERO));
        let clock = settings
            .clock
            .clone()
            .unwrap_or_else(|| Arc::new(Instant::now));
        let sweep_every = settings.resolved_sweep_interval();
        let epoch = (clock)();
        Self {
            policy,
            ttl: settings.ttl,
            mode: settings.mode,
            sweep_every,
            clock,
            wheel: ExpiryWheel::new(sweep_every, epoch),
            deadlines: FxHashMap::default(),
            _values: std::marker::PhantomData,
        }
    }

    /// Returns `true` when a nonzero TTL is configured.
    pub fn has_expiry(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// The period the sweeper should tick at.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_every
    }

    /// Access to the wrapped policy.
    pub fn inner(&self) -> &P {
        &self.policy
    }

    fn now(&self) -> Instant {
        (self.clock)()
    }

    fn is_expired(&self, key: &K, now: Instant) -> bool {
        match self.deadlines.get(key) {
            Some(deadline) => deadline.expires_at <= now,
            None => false,
        }
    }

    fn unfile(&mut self, key: &K) {
        if let Some(deadline) = self.deadlines.remove(key) {
            self.wheel.unfile(deadline.slot);
        }
    }

    fn refile(&mut self, key: &K, now: Instant) {
        self.unfile(key);
        let expires_at = now + self.ttl;
        let slot = self.wheel.file(key.clone(), expires_at);
        self.deadlines.insert(key.clone(), Deadline { expires_at, slot });
    }

    /// Removes one expired resident to make room, if the cache is full.
    fn evict_one_expired(&mut self, now: Instant) -> Option<(K, V)> {
        let cap = self.policy.capacity();
        if cap == 0 || self.policy.len() < cap {
            return None;
        }
        let victim = self.wheel.pop_expired(now)?;
        self.deadlines.remove(&victim);
        let value = self.policy.remove(&victim)?;
        Some((victim, value))
    }

    /// Time to sleep before the next wheel bucket is fully expired, or
    /// `None` if it can be drained now. The caller sleeps outside the lock.
    pub fn sweep_wait(&self) -> Option<Duration> {
        if !self.has_expiry() {
            return None;
        }
        self.wheel.sweep_wait(self.now())
    }

    /// Drains the current wheel bucket, removing every expired entry
    /// through the wrapped policy. Returns the removed pairs in expiry
    /// filing order.
    pub fn sweep_collect(&mut self) -> Vec<(K, V)> {
        if !self.has_expiry() {
            return Vec::new();
        }
        let now = self.now();
        let keys = self.wheel.sweep_take(now);
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            self.deadlines.remove(&key);
            if let Some(value) = self.policy.remove(&key) {
                removed.push((key, value));
            }
        }
        removed
    }
}

impl<K, V, P> Policy<K, V> for ExpirableCache<K, V, P>
where
    K: Eq + Hash + Clone,
    P: Policy<K, V>,
{
    fn add(&mut self, key: K, value: V) -> AddOutcome<K, V> {
        if !self.has_expiry() {
            return self.policy.add(key, value);
        }
        let now = self.now();
        let expired = if self.policy.contains(&key) {
            None
        } else {
            self.evict_one_expired(now)
        };

        let outcome = self.policy.add(key.clone(), value);
        self.refile(&key, now);
        match outcome {
            AddOutcome::Updated => AddOutcome::Updated,
            AddOutcome::Added => match expired {
                Some((k, v)) => AddOutcome::Evicted(k, v),
                None => AddOutcome::Added,
            },
            AddOutcome::Evicted(evicted_key, evicted_value) => {
                self.unfile(&evicted_key);
                AddOutcome::Evicted(evicted_key, evicted_value)
            }
        }
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        if !self.has_expiry() {
            return self.policy.get(key);
        }
        let now = self.now();
        self.policy.get(key)?;
        if self.is_expired(key, now) {
            return None;
        }
        if self.mode == ExpiryMode::AfterAccess {
            self.refile(key, now);
        }
        self.policy.peek(key)
    }

    fn peek(&self, key: &K) -> Option<&V> {
        let value = self.policy.peek(key)?;
        if self.has_expiry() && self.is_expired(key, self.now()) {
            return None;
        }
        Some(value)
    }

    fn contains(&self, key: &K) -> bool {
        if !self.policy.contains(key) {
            return false;
        }
        !(self.has_expiry() && self.is_expired(key, self.now()))
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.policy.remove(key)?;
        self.unfile(key);
        Some(value)
    }

    fn remove_oldest(&mut self) -> Option<(K, V)> {
        let (key, value) = self.policy.remove_oldest()?;
        self.unfile(&key);
        Some((key, value))
    }

    fn get_oldest(&self) -> Option<(&K, &V)> {
        self.policy.get_oldest()
    }

    fn resize(&mut self, new_cap: usize) -> Vec<(K, V)> {
        let evicted = self.policy.resize(new_cap);
        for (key, _) in &evicted {
            self.unfile(key);
        }
        evicted
    }

    fn keys(&self) -> Vec<K> {
        self.policy.keys()
    }

    fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        if !self.has_expiry() {
            return self.policy.values();
        }
        let now = self.now();
        self.policy
            .keys()
            .into_iter()
            .filter(|key| !self.is_expired(key, now))
            .filter_map(|key| self.policy.peek(&key).cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.policy.len()
    }

    fn capacity(&self) -> usize {
        self.policy.capacity()
    }

    fn purge(&mut self) {
        self.policy.purge();
        self.wheel.clear();
        self.deadlines.clear();
    }
}

impl<K, V, P: std::fmt::Debug> std::fmt::Debug for ExpirableCache<K, V, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirableCache")
            .field("policy", &self.policy)
            .field("ttl", &self.ttl)
            .field("mode", &self.mode)
            .field("tracked", &self.deadlines.len())
            .finish_non_exhaustive()
    }
}
