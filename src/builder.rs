//! Unified cache builder for all eviction policies.
//!
//! Picks a policy core, optionally layers TTL expiry and an eviction
//! callback on top, and produces a thread-safe [`Cache`].
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use lrukit::builder::{CacheBuilder, CachePolicy};
//! use lrukit::cache::Cache;
//! use lrukit::expire::TtlSettings;
//!
//! let cache: Cache<u64, String> = CacheBuilder::new(1000)
//!     .policy(CachePolicy::Arc)
//!     .with_ttl(TtlSettings::new(Duration::from_secs(300)))
//!     .build()
//!     .unwrap();
//!
//! cache.add(1, "hello".to_string());
//! assert_eq!(cache.get(&1), Some("hello".to_string()));
//! ```

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::{Backend, Cache, EvictCallback};
use crate::error::ConfigError;
use crate::expire::{ExpirableCache, TtlSettings};
use crate::policy::two_queue::{DEFAULT_GHOST_RATIO, DEFAULT_RECENT_RATIO};
use crate::policy::{ArcCore, LruCore, SieveCore, TwoQueueCore};

/// Available cache eviction policies.
#[derive(Debug, Clone, PartialEq)]
pub enum CachePolicy {
    /// Least Recently Used eviction.
    Lru,
    /// SIEVE eviction (insertion order with a visited bit).
    Sieve,
    /// 2Q eviction with configurable recent/ghost ratios.
    TwoQueue {
        /// Fraction of capacity reserved for entries seen once.
        recent_ratio: f64,
        /// Fraction of capacity used to remember evicted keys.
        ghost_ratio: f64,
    },
    /// Adaptive Replacement Cache eviction.
    Arc,
}

impl CachePolicy {
    /// 2Q with the standard ratios (recent 0.25, ghost 0.50).
    pub fn two_queue() -> Self {
        CachePolicy::TwoQueue {
            recent_ratio: DEFAULT_RECENT_RATIO,
            ghost_ratio: DEFAULT_GHOST_RATIO,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Lru
    }
}

/// Builder for [`Cache`] instances.
pub struct CacheBuilder<K, V> {
    capacity: usize,
    policy: CachePolicy,
    ttl: Option<TtlSettings>,
    on_evict: Option<EvictCallback<K, V>>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts a builder for a cache holding at most `capacity` entries.
    ///
    /// A capacity of 0 means "no capacity bound" and is only accepted when
    /// combined with a TTL and the LRU policy.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            policy: CachePolicy::default(),
            ttl: None,
            on_evict: None,
        }
    }

    /// Selects the eviction policy. Defaults to LRU.
    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Layers per-entry TTL on top of the policy and enables the background
    /// sweeper.
    pub fn with_ttl(mut self, settings: TtlSettings) -> Self {
        self.ttl = Some(settings);
        self
    }

    /// Registers a callback invoked once per evicted resident, outside the
    /// cache lock, in eviction order.
    pub fn with_callback(mut self, callback: impl Fn(K, V) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Arc::new(callback));
        self
    }

    /// Validates the configuration and produces the cache.
    pub fn build(self) -> Result<Cache<K, V>, ConfigError> {
        let ttl_active = self
            .ttl
            .as_ref()
            .map(|settings| !settings.ttl.is_zero())
            .unwrap_or(false);

        if let Some(settings) = &self.ttl {
            if ttl_active && settings.sweep_interval == Some(Duration::ZERO) {
                return Err(ConfigError::InvalidParameter("sweep interval"));
            }
        }

        let backend = if self.capacity == 0 {
            if ttl_active && self.policy == CachePolicy::Lru {
                Backend::Lru(LruCore::unbounded())
            } else {
                return Err(ConfigError::InvalidCapacity);
            }
        } else {
            match self.policy {
                CachePolicy::Lru => Backend::Lru(LruCore::new(self.capacity)?),
                CachePolicy::Sieve => Backend::Sieve(SieveCore::new(self.capacity)?),
                CachePolicy::TwoQueue {
                    recent_ratio,
                    ghost_ratio,
                } => Backend::TwoQueue(TwoQueueCore::with_ratios(
                    self.capacity,
                    recent_ratio,
                    ghost_ratio,
                )?),
                CachePolicy::Arc => Backend::Arc(ArcCore::new(self.capacity)?),
            }
        };

        let expirable = ExpirableCache::new(backend, self.ttl);
        let mut cache = Cache::from_parts(expirable, self.on_evict);
        if ttl_active {
            cache.spawn_sweeper();
            debug!(capacity = self.capacity, "cache built with expiry sweeper");
        }
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use std::time::Duration;

    fn policies() -> Vec<CachePolicy> {
        vec![
            CachePolicy::Lru,
            CachePolicy::Sieve,
            CachePolicy::two_queue(),
            CachePolicy::Arc,
        ]
    }

    #[test]
    fn all_policies_basic_ops() {
        for policy in policies() {
            let cache: Cache<u64, String> =
                CacheBuilder::new(10).policy(policy.clone()).build().unwrap();

            assert!(!cache.add(1, "one".to_string()));
            assert!(!cache.add(2, "two".to_string()));

            assert_eq!(cache.get(&1), Some("one".to_string()));
            assert_eq!(cache.get(&2), Some("two".to_string()));
            assert_eq!(cache.get(&3), None);

            assert!(cache.contains(&1));
            assert!(!cache.contains(&99));

            assert_eq!(cache.len(), 2);
            assert!(!cache.is_empty());
            assert_eq!(cache.cap(), 10);

            cache.add(1, "ONE".to_string());
            assert_eq!(cache.peek(&1), Some("ONE".to_string()));

            assert!(cache.remove(&2));
            assert!(!cache.remove(&2));

            cache.purge();
            assert!(cache.is_empty());
        }
    }

    #[test]
    fn capacity_is_enforced_for_every_policy() {
        for policy in policies() {
            let cache: Cache<u64, u64> = CacheBuilder::new(8).policy(policy.clone()).build().unwrap();
            for i in 0..64 {
                cache.add(i, i);
            }
            assert!(
                cache.len() <= 8,
                "{policy:?} exceeded its capacity: {}",
                cache.len()
            );
        }
    }

    #[test]
    fn zero_capacity_is_rejected_without_ttl() {
        for policy in policies() {
            let result: Result<Cache<u64, u64>, _> =
                CacheBuilder::new(0).policy(policy).build();
            assert_eq!(result.unwrap_err(), ConfigError::InvalidCapacity);
        }
    }

    #[test]
    fn zero_capacity_with_ttl_builds_unbounded_lru() {
        let cache: Cache<u64, u64> = CacheBuilder::new(0)
            .with_ttl(TtlSettings::new(Duration::from_secs(60)))
            .build()
            .unwrap();
        for i in 0..100 {
            assert!(!cache.add(i, i));
        }
        assert_eq!(cache.len(), 100);
        assert_eq!(cache.cap(), 0);
    }

    #[test]
    fn zero_capacity_with_ttl_requires_lru() {
        let result: Result<Cache<u64, u64>, _> = CacheBuilder::new(0)
            .policy(CachePolicy::Sieve)
            .with_ttl(TtlSettings::new(Duration::from_secs(60)))
            .build();
        assert_eq!(result.unwrap_err(), ConfigError::InvalidCapacity);
    }

    #[test]
    fn invalid_ratios_are_rejected() {
        let result: Result<Cache<u64, u64>, _> = CacheBuilder::new(10)
            .policy(CachePolicy::TwoQueue {
                recent_ratio: 1.5,
                ghost_ratio: 0.5,
            })
            .build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidParameter("recent ratio")
        );
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let result: Result<Cache<u64, u64>, _> = CacheBuilder::new(10)
            .with_ttl(TtlSettings::new(Duration::from_secs(60)).sweep_interval(Duration::ZERO))
            .build();
        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidParameter("sweep interval")
        );
    }
}
