//! Reclaimable value slot.
//!
//! A slot wraps one cached value together with the key it was stored under.
//! It is either `Live` (the payload is retrievable) or `Reclaimed` (the
//! payload has been released and the slot is waiting to be swept out of the
//! table). The transition happens exactly once.
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────────────┐   detach() / detach_if_unpinned()   ┌─────────────┐
//!   │ Live(Arc<V>) │ ───────────────────────────────────► │  Reclaimed  │
//!   └──────────────┘                                      └─────────────┘
//!          │                                                      │
//!    pins > 0: protected from the evictor            swept from the table
//! ```
//!
//! The payload lock is held only to clone or take the `Arc<V>`; the cleaner
//! always runs after it is released.
use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::ds::pin_ring::PinTarget;
use crate::traits::ValueCleaner;

/// Cleaner shared by every slot of one cache.
pub type SharedCleaner<K, V> = Arc<dyn ValueCleaner<K, V>>;

/// Outcome of running the cleaner on a released value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanOutcome {
    /// No cleaner is configured.
    Skipped,
    /// The cleaner returned `Ok`.
    Cleaned,
    /// The cleaner returned an error or panicked; the failure was logged.
    Failed,
}

/// Retained-or-reclaimable wrapper around one cached value.
pub struct Slot<K, V> {
    key: K,
    payload: RwLock<Option<Arc<V>>>,
    pins: AtomicUsize,
    cleaner: Option<SharedCleaner<K, V>>,
}

impl<K, V> Slot<K, V> {
    /// Creates a live slot for `value` stored under `key`.
    pub fn new(key: K, value: Arc<V>, cleaner: Option<SharedCleaner<K, V>>) -> Self {
        Self {
            key,
            payload: RwLock::new(Some(value)),
            pins: AtomicUsize::new(0),
            cleaner,
        }
    }

    /// Returns the key this slot was stored under.
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Returns the payload, or `None` once the slot has been reclaimed.
    #[inline]
    pub fn value(&self) -> Option<Arc<V>> {
        self.payload.read().clone()
    }

    /// Returns `true` while the payload is retrievable.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.payload.read().is_some()
    }

    /// Number of pin-ring occurrences currently protecting this slot.
    #[inline]
    pub fn pin_count(&self) -> usize {
        self.pins.load(Ordering::Acquire)
    }

    /// Moves the slot to `Reclaimed`, returning the released payload.
    ///
    /// Returns `None` if the slot was already reclaimed, so exactly one caller
    /// ever receives the payload.
    pub fn detach(&self) -> Option<Arc<V>> {
        self.payload.write().take()
    }

    /// Like [`detach`](Self::detach), but only when no pin protects the slot.
    ///
    /// Callers must hold the pin-ring lock so the pin count cannot change
    /// between the check and the transition.
    pub fn detach_if_unpinned(&self) -> Option<Arc<V>> {
        if self.pin_count() > 0 {
            return None;
        }
        self.detach()
    }

    /// Hands a payload released by `detach*` to the cleaner.
    ///
    /// Errors and panics raised by the cleaner are logged and swallowed.
    pub fn clean(&self, value: &V) -> CleanOutcome {
        let Some(cleaner) = &self.cleaner else {
            return CleanOutcome::Skipped;
        };

        match catch_unwind(AssertUnwindSafe(|| cleaner.clean(&self.key, value))) {
            Ok(Ok(())) => CleanOutcome::Cleaned,
            Ok(Err(err)) => {
                tracing::error!(error = %err, "value cleaner failed while releasing a cached value");
                CleanOutcome::Failed
            },
            Err(payload) => {
                tracing::error!(
                    panic = panic_message(payload.as_ref()),
                    "value cleaner panicked while releasing a cached value"
                );
                CleanOutcome::Failed
            },
        }
    }

    /// Detaches the payload and runs the cleaner on it.
    ///
    /// Returns `None` if another caller already reclaimed the slot.
    pub fn reclaim(&self) -> Option<CleanOutcome> {
        let value = self.detach()?;
        Some(self.clean(&value))
    }
}

impl<K, V> PinTarget for Slot<K, V> {
    #[inline]
    fn acquire_pin(&self) {
        self.pins.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    fn release_pin(&self) {
        self.pins.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Slot<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("key", &self.key)
            .field("live", &self.is_live())
            .field("pins", &self.pin_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
