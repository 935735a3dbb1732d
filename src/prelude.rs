pub use crate::builder::SoftCacheBuilder;
pub use crate::cache::{DEFAULT_PIN_CAPACITY, Entries, Iter, Keys, SoftCache, Values};
pub use crate::ds::{PinRing, PinTarget};
pub use crate::error::{CacheError, CleanupError, ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::SoftCacheMetricsSnapshot;
pub use crate::policy::pressure::MemoryPressure;
pub use crate::policy::reclaim::{Manual, OnPressure, ReclaimState, ReclaimStrategy, SoftLimit};
pub use crate::traits::ValueCleaner;
