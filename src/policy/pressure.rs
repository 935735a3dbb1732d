//! Memory-pressure signal.
//!
//! The host decides when memory is low; the cache only reacts. A
//! [`MemoryPressure`] handle is cheap to clone and may be shared by any
//! number of caches. Raising it bumps an epoch; each cache remembers the last
//! epoch it acted on, so every cache reacts exactly once per raise, on its
//! next operation.
//!
//! ```text
//!   host ── raise() ──► epoch: 3 ─┬─► cache A (seen 2 → reacts, seen 3)
//!                                 └─► cache B (seen 2 → reacts, seen 3)
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use softcache::builder::SoftCacheBuilder;
//! use softcache::cache::SoftCache;
//! use softcache::policy::pressure::MemoryPressure;
//!
//! let pressure = MemoryPressure::new();
//! let cache: SoftCache<u32, String> = SoftCacheBuilder::new()
//!     .pin_capacity(1)
//!     .pressure(pressure.clone())
//!     .build();
//!
//! cache.insert(1, "cold".to_string());
//! cache.insert(2, "hot".to_string());
//!
//! pressure.raise();
//! // The next operation releases every unpinned entry.
//! assert!(cache.get(&1).is_none());
//! assert_eq!(cache.get(&2).as_deref(), Some(&"hot".to_string()));
//! ```
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared "memory is low" signal raised by the host.
#[derive(Debug, Clone, Default)]
pub struct MemoryPressure {
    epoch: Arc<AtomicU64>,
}

impl MemoryPressure {
    /// Creates a signal that has never been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifies every cache watching this signal that memory is low.
    pub fn raise(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of times the signal has been raised.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

/// Per-cache view of a [`MemoryPressure`] signal.
#[derive(Debug)]
pub(crate) struct PressureWatch {
    signal: MemoryPressure,
    seen: AtomicU64,
}

impl PressureWatch {
    /// Starts watching `signal`; raises that happened earlier are ignored.
    pub(crate) fn new(signal: MemoryPressure) -> Self {
        let seen = AtomicU64::new(signal.epoch());
        Self { signal, seen }
    }

    /// Returns `true` to exactly one caller per new raise.
    pub(crate) fn poll(&self) -> bool {
        let now = self.signal.epoch();
        let seen = self.seen.load(Ordering::Acquire);
        now != seen
            && self
                .seen
                .compare_exchange(seen, now, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_reacts_once_per_raise() {
        let signal = MemoryPressure::new();
        let watch = PressureWatch::new(signal.clone());
        assert!(!watch.poll());

        signal.raise();
        assert!(watch.poll());
        assert!(!watch.poll());

        // Several raises before a poll collapse into one reaction.
        signal.raise();
        signal.raise();
        assert!(watch.poll());
        assert!(!watch.poll());
    }

    #[test]
    fn earlier_raises_are_ignored() {
        let signal = MemoryPressure::new();
        signal.raise();
        let watch = PressureWatch::new(signal.clone());
        assert!(!watch.poll());
        assert_eq!(signal.epoch(), 1);
    }

    #[test]
    fn every_watch_sees_a_shared_raise() {
        let signal = MemoryPressure::new();
        let a = PressureWatch::new(signal.clone());
        let b = PressureWatch::new(signal.clone());
        signal.raise();
        assert!(a.poll());
        assert!(b.poll());
    }

    #[test]
    fn concurrent_pollers_single_winner() {
        let signal = MemoryPressure::new();
        let watch = Arc::new(PressureWatch::new(signal.clone()));
        signal.raise();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let watch = watch.clone();
                std::thread::spawn(move || watch.poll())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
