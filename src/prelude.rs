pub use crate::builder::{CacheBuilder, CachePolicy};
pub use crate::cache::{Cache, EvictCallback};
pub use crate::error::{ConfigError, LoaderError};
pub use crate::expire::{Clock, ExpirableCache, ExpiryMode, TtlSettings};
pub use crate::fill::FillingCache;
pub use crate::policy::{ArcCore, LruCore, SieveCore, TwoQueueCore};
pub use crate::traits::{AddOutcome, Policy};
