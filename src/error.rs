//! Error types for the lrukit library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned by fallible constructors when configuration
//!   parameters are invalid (zero capacity, out-of-range ratios).
//! - [`LoaderError`]: Returned by [`FillingCache::get`](crate::fill::FillingCache::get)
//!   when the user-supplied loader fails.
//!
//! Runtime cache operations (`get`, `add`, `remove`, ...) cannot fail and do
//! not report errors; misses are expressed as `Option`/`bool` returns.
//!
//! ## Example Usage
//!
//! ```
//! use lrukit::error::ConfigError;
//! use lrukit::policy::two_queue::TwoQueueCore;
//!
//! // Fallible constructor for user-configurable parameters
//! let cache: Result<TwoQueueCore<String, i32>, ConfigError> =
//!     TwoQueueCore::with_ratios(100, 0.25, 0.5);
//! assert!(cache.is_ok());
//!
//! // Invalid ratio is caught without panicking
//! let bad = TwoQueueCore::<String, i32>::with_ratios(100, 2.0, 0.5);
//! assert_eq!(bad.unwrap_err(), ConfigError::InvalidParameter("recent ratio"));
//! ```

use thiserror::Error;

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by fallible constructors such as
/// [`LruCore::new`](crate::policy::lru::LruCore::new) and
/// [`CacheBuilder::build`](crate::builder::CacheBuilder::build).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Capacity was zero where the policy requires at least one slot.
    #[error("capacity must be greater than zero")]
    InvalidCapacity,

    /// A tuning parameter was outside its valid range. Carries the name of
    /// the offending parameter.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
}

/// Error surfaced by the filling cache when a load fails.
///
/// Carries the message produced by the user loader. Loader errors can be
/// cached alongside values, so the same `LoaderError` may be handed to every
/// caller that coalesced onto one load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("loader failed: {0}")]
pub struct LoaderError(pub String);

impl LoaderError {
    /// Creates a new `LoaderError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
