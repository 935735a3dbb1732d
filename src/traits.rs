//! # Collaborator traits
//!
//! The cache itself is generic over what it stores. The only behaviour a
//! caller plugs in is what happens when a value's storage is released, and
//! that is expressed by [`ValueCleaner`].
//!
//! ```text
//!   Live(value) ──reclaim()──► Reclaimed
//!                     │
//!                     └──► cleaner.clean(&key, &value)   (once, best-effort)
//! ```
//!
//! The reclamation policy trait lives next to its implementations in
//! [`policy::reclaim`](crate::policy::reclaim).
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use softcache::builder::SoftCacheBuilder;
//! use softcache::cache::SoftCache;
//! use softcache::error::CleanupError;
//!
//! let closed = Arc::new(AtomicUsize::new(0));
//! let counter = closed.clone();
//! let cache: SoftCache<u32, Vec<u8>> = SoftCacheBuilder::new()
//!     .cleaner(move |_key: &u32, _tile: &Vec<u8>| -> Result<(), CleanupError> {
//!         counter.fetch_add(1, Ordering::Relaxed);
//!         Ok(())
//!     })
//!     .build();
//!
//! cache.insert(7, vec![0; 16]);
//! assert!(cache.reclaim(&7));
//! assert_eq!(closed.load(Ordering::Relaxed), 1);
//! ```

use crate::error::CleanupError;

/// Hook invoked when a cached value's storage is released by reclamation.
///
/// Called at most once per stored value, on whichever thread performs the
/// release. Overwritten and explicitly removed values are handed back to the
/// caller instead and never reach the cleaner.
///
/// Returning an error, or panicking, is treated as a defect in the cleaner:
/// the failure is logged and the cache keeps going.
pub trait ValueCleaner<K, V>: Send + Sync {
    /// Releases whatever external resources `value` holds.
    fn clean(&self, key: &K, value: &V) -> Result<(), CleanupError>;
}

impl<K, V, F> ValueCleaner<K, V> for F
where
    F: Fn(&K, &V) -> Result<(), CleanupError> + Send + Sync,
{
    #[inline]
    fn clean(&self, key: &K, value: &V) -> Result<(), CleanupError> {
        self(key, value)
    }
}
