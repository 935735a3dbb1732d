//! Configuration for [`SoftCache`].
//!
//! Collects the pin capacity, shard count, cleaner, reclamation strategy,
//! memory-pressure signal and map hasher, then validates them in
//! [`try_build`](SoftCacheBuilder::try_build).
//!
//! ## Example
//!
//! ```rust
//! use softcache::builder::SoftCacheBuilder;
//! use softcache::error::CleanupError;
//! use softcache::policy::reclaim::SoftLimit;
//!
//! let cache = SoftCacheBuilder::<u64, String>::new()
//!     .pin_capacity(8)
//!     .shards(4)
//!     .strategy(SoftLimit::new(1_000))
//!     .cleaner(|key: &u64, _value: &String| -> Result<(), CleanupError> {
//!         println!("released tile {key}");
//!         Ok(())
//!     })
//!     .build();
//! cache.insert(1, "hello".to_string());
//! assert_eq!(cache.get(&1).as_deref(), Some(&"hello".to_string()));
//! ```

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::thread;

use crate::cache::{CacheParts, DEFAULT_PIN_CAPACITY, SoftCache};
use crate::error::ConfigError;
use crate::policy::pressure::{MemoryPressure, PressureWatch};
use crate::policy::reclaim::{OnPressure, ReclaimStrategy};
use crate::store::slot::SharedCleaner;
use crate::traits::ValueCleaner;

/// Shards per available CPU when no shard count is configured.
const SHARDS_PER_CPU: usize = 4;

/// Builder for [`SoftCache`].
pub struct SoftCacheBuilder<K, V, S = RandomState> {
    pin_capacity: usize,
    shards: Option<usize>,
    cleaner: Option<SharedCleaner<K, V>>,
    strategy: Box<dyn ReclaimStrategy>,
    pressure: Option<MemoryPressure>,
    hasher: S,
}

impl<K, V> SoftCacheBuilder<K, V, RandomState> {
    /// Creates a builder with the defaults: 20 pinned values, shards sized
    /// from the available parallelism, no cleaner and [`OnPressure`].
    pub fn new() -> Self {
        Self {
            pin_capacity: DEFAULT_PIN_CAPACITY,
            shards: None,
            cleaner: None,
            strategy: Box::new(OnPressure),
            pressure: None,
            hasher: RandomState::new(),
        }
    }
}

impl<K, V> Default for SoftCacheBuilder<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SoftCacheBuilder<K, V, S> {
    /// Sets how many recently touched values are pinned. Must be positive.
    pub fn pin_capacity(mut self, pin_capacity: usize) -> Self {
        self.pin_capacity = pin_capacity;
        self
    }

    /// Sets the number of table shards. Must be positive.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Sets the callback run once for every value the cache releases.
    pub fn cleaner<C>(mut self, cleaner: C) -> Self
    where
        C: ValueCleaner<K, V> + 'static,
    {
        self.cleaner = Some(Arc::new(cleaner));
        self
    }

    /// Sets a cleaner shared with other caches.
    pub fn shared_cleaner(mut self, cleaner: SharedCleaner<K, V>) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    /// Sets the reclamation strategy.
    pub fn strategy<R>(mut self, strategy: R) -> Self
    where
        R: ReclaimStrategy + 'static,
    {
        self.strategy = Box::new(strategy);
        self
    }

    /// Subscribes the cache to a memory-pressure signal.
    pub fn pressure(mut self, pressure: MemoryPressure) -> Self {
        self.pressure = Some(pressure);
        self
    }

    /// Sets the hasher used inside each shard.
    pub fn hasher<S2>(self, hasher: S2) -> SoftCacheBuilder<K, V, S2> {
        SoftCacheBuilder {
            pin_capacity: self.pin_capacity,
            shards: self.shards,
            cleaner: self.cleaner,
            strategy: self.strategy,
            pressure: self.pressure,
            hasher,
        }
    }
}

impl<K, V, S> SoftCacheBuilder<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics if the pin capacity or the shard count is zero. For a
    /// non-panicking alternative, use [`try_build`](Self::try_build).
    pub fn build(self) -> SoftCache<K, V, S> {
        match self.try_build() {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds the cache, returning an error on invalid parameters instead of
    /// panicking.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the pin capacity or the shard count is
    /// zero.
    ///
    /// # Example
    ///
    /// ```
    /// use softcache::builder::SoftCacheBuilder;
    ///
    /// let err = SoftCacheBuilder::<u64, String>::new()
    ///     .pin_capacity(0)
    ///     .try_build()
    ///     .unwrap_err();
    /// assert!(err.message().contains("pin capacity"));
    /// ```
    pub fn try_build(self) -> Result<SoftCache<K, V, S>, ConfigError> {
        if self.pin_capacity == 0 {
            return Err(ConfigError::new("pin capacity must be greater than zero"));
        }
        let shards = match self.shards {
            Some(0) => return Err(ConfigError::new("shard count must be greater than zero")),
            Some(shards) => shards,
            None => default_shards(),
        };

        tracing::debug!(
            pin_capacity = self.pin_capacity,
            shards,
            strategy = ?self.strategy,
            "building soft cache"
        );
        Ok(SoftCache::from_parts(CacheParts {
            pin_capacity: self.pin_capacity,
            shards,
            hasher: self.hasher,
            cleaner: self.cleaner,
            strategy: self.strategy,
            pressure: self.pressure.map(PressureWatch::new),
        }))
    }
}

impl<K, V, S> fmt::Debug for SoftCacheBuilder<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftCacheBuilder")
            .field("pin_capacity", &self.pin_capacity)
            .field("shards", &self.shards)
            .field("has_cleaner", &self.cleaner.is_some())
            .field("strategy", &self.strategy)
            .field("pressure", &self.pressure)
            .finish_non_exhaustive()
    }
}

fn default_shards() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(SHARDS_PER_CPU)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use rustc_hash::FxBuildHasher;

    use super::*;
    use crate::error::CleanupError;
    use crate::policy::reclaim::Manual;

    #[test]
    fn defaults() {
        let cache: SoftCache<u32, u32> = SoftCacheBuilder::new().build();
        assert_eq!(cache.pin_capacity(), DEFAULT_PIN_CAPACITY);
        assert!(default_shards() >= SHARDS_PER_CPU);
    }

    #[test]
    fn rejects_zero_pin_capacity_and_shards() {
        let err = SoftCacheBuilder::<u32, u32>::new()
            .pin_capacity(0)
            .try_build()
            .unwrap_err();
        assert!(err.message().contains("pin capacity"));

        let err = SoftCacheBuilder::<u32, u32>::new()
            .shards(0)
            .try_build()
            .unwrap_err();
        assert!(err.message().contains("shard count"));
    }

    #[test]
    #[should_panic(expected = "pin capacity")]
    fn build_panics_on_zero_pin_capacity() {
        let _ = SoftCache::<u32, u32>::with_pin_capacity(0);
    }

    #[test]
    fn custom_hasher_and_shared_cleaner() {
        let cleaned = Arc::new(AtomicUsize::new(0));
        let cleaner: SharedCleaner<u32, u32> = {
            let cleaned = cleaned.clone();
            Arc::new(move |_key: &u32, _value: &u32| -> Result<(), CleanupError> {
                cleaned.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        let first = SoftCacheBuilder::new()
            .hasher(FxBuildHasher)
            .strategy(Manual)
            .shared_cleaner(cleaner.clone())
            .build();
        let second: SoftCache<u32, u32> = SoftCacheBuilder::new()
            .shared_cleaner(cleaner)
            .build();

        first.insert(1u32, 1u32);
        second.insert(1, 1);
        assert!(first.reclaim(&1));
        assert!(second.reclaim(&1));
        assert_eq!(cleaned.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn builder_debug_hides_cleaner() {
        let builder = SoftCacheBuilder::<u8, u8>::new()
            .cleaner(|_key: &u8, _value: &u8| -> Result<(), CleanupError> { Ok(()) });
        let text = format!("{:?}", builder);
        assert!(text.contains("has_cleaner: true"));
        assert!(text.contains("OnPressure"));
    }
}
