//! Bounded FIFO of strongly held handles.
//!
//! Keeps the most recently touched handles alive. Every `pin` appends at the
//! back and trims from the front, both inside one critical section, so no
//! thread ever observes the ring longer than its capacity.
//!
//! ## Architecture
//!
//! ```text
//!   Mutex<VecDeque<T>>                       capacity = 4
//!
//!   front (oldest)                           back (newest)
//!   ┌──────┬──────┬──────┬──────┐
//!   │  A   │  B   │  A   │  C   │  ◄── pin(D)
//!   └──────┴──────┴──────┴──────┘
//!      │
//!      └── trimmed: A.release_pin()   A stays pinned (count 2 -> 1)
//! ```
//!
//! ## Pin Counting
//! - Items implement [`PinTarget`]; the ring calls `acquire_pin` on push and
//!   `release_pin` on trim or clear, always while holding its lock.
//! - The same item may sit in the ring several times; its counter counts the
//!   occurrences. A counter of zero means "not protected by the ring".
//!
//! ## Performance
//! - `pin`: O(1), one push and at most one pop under the lock
//! - `clear`: O(capacity)
//!
//! Trimmed handles are dropped after the lock is released, so a handle whose
//! last strong reference was the ring never runs its destructor under the lock.
//!
//! `debug_validate_invariants()` is available in debug/test builds.
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// An item whose protection by a [`PinRing`] is tracked by the item itself.
pub trait PinTarget {
    /// Records one more ring occurrence.
    fn acquire_pin(&self);
    /// Records one ring occurrence going away.
    fn release_pin(&self);
}

impl<T: PinTarget + ?Sized> PinTarget for Arc<T> {
    #[inline]
    fn acquire_pin(&self) {
        (**self).acquire_pin();
    }

    #[inline]
    fn release_pin(&self) {
        (**self).release_pin();
    }
}

/// Thread-safe bounded FIFO of pinned handles.
#[derive(Debug)]
pub struct PinRing<T> {
    ring: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T: PinTarget> PinRing<T> {
    /// Creates a ring that holds at most `capacity` handles.
    ///
    /// A zero capacity makes every `pin` a no-op.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(VecDeque::with_capacity(capacity.saturating_add(1))),
            capacity,
        }
    }

    /// Returns the configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of handles currently held.
    pub fn len(&self) -> usize {
        self.ring.lock().len()
    }

    /// Returns `true` if no handle is held.
    pub fn is_empty(&self) -> bool {
        self.ring.lock().is_empty()
    }

    /// Appends `item` as the newest handle, trimming the oldest one if the
    /// ring grew past its capacity.
    ///
    /// Returns the ring length at the end of the critical section.
    pub fn pin(&self, item: T) -> usize {
        if self.capacity == 0 {
            return 0;
        }

        let mut ring = self.ring.lock();
        item.acquire_pin();
        ring.push_back(item);
        // Capacity is fixed, so a single push overflows by at most one.
        let trimmed = if ring.len() > self.capacity {
            ring.pop_front()
        } else {
            None
        };
        if let Some(old) = &trimmed {
            old.release_pin();
        }
        let len = ring.len();
        drop(ring);
        drop(trimmed);
        len
    }

    /// Releases every handle.
    pub fn clear(&self) {
        let drained: Vec<T> = {
            let mut ring = self.ring.lock();
            ring.drain(..)
                .inspect(|item| item.release_pin())
                .collect()
        };
        drop(drained);
    }

    /// Runs `f` while holding the ring lock.
    ///
    /// No `pin` or `clear` can change any pin count while `f` runs. `f` must
    /// not call back into this ring.
    pub fn with_locked<R>(&self, f: impl FnOnce(&RingGuard<'_, T>) -> R) -> R {
        let guard = RingGuard {
            ring: self.ring.lock(),
        };
        f(&guard)
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        let ring = self.ring.lock();
        assert!(ring.len() <= self.capacity);
        if self.capacity == 0 {
            assert!(ring.is_empty());
        }
    }
}

/// Read access to a locked ring.
pub struct RingGuard<'a, T> {
    ring: MutexGuard<'a, VecDeque<T>>,
}

impl<T> RingGuard<'_, T> {
    /// Returns the number of handles held.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` if no handle is held.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Iterates from the oldest to the newest handle.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.ring.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[derive(Debug, Default)]
    struct Counted {
        id: usize,
        pins: AtomicUsize,
    }

    impl Counted {
        fn new(id: usize) -> Arc<Self> {
            Arc::new(Self {
                id,
                pins: AtomicUsize::new(0),
            })
        }

        fn pins(&self) -> usize {
            self.pins.load(Ordering::Relaxed)
        }
    }

    impl PinTarget for Counted {
        fn acquire_pin(&self) {
            self.pins.fetch_add(1, Ordering::Relaxed);
        }

        fn release_pin(&self) {
            self.pins.fetch_sub(1, Ordering::Relaxed);
        }
    }

    fn ids(ring: &PinRing<Arc<Counted>>) -> Vec<usize> {
        ring.with_locked(|guard| guard.iter().map(|item| item.id).collect())
    }

    #[test]
    fn pin_ring_trims_oldest_first() {
        let ring = PinRing::new(2);
        let (a, b, c) = (Counted::new(1), Counted::new(2), Counted::new(3));

        assert_eq!(ring.pin(a.clone()), 1);
        assert_eq!(ring.pin(b.clone()), 2);
        assert_eq!(ring.pin(c.clone()), 2);

        assert_eq!(ids(&ring), vec![2, 3]);
        assert_eq!(a.pins(), 0);
        assert_eq!(b.pins(), 1);
        assert_eq!(c.pins(), 1);
    }

    #[test]
    fn pin_ring_counts_duplicates() {
        let ring = PinRing::new(3);
        let a = Counted::new(1);
        let b = Counted::new(2);

        ring.pin(a.clone());
        ring.pin(a.clone());
        ring.pin(b.clone());
        assert_eq!(a.pins(), 2);

        ring.pin(b.clone());
        assert_eq!(a.pins(), 1);
        assert_eq!(b.pins(), 2);
        assert_eq!(ids(&ring), vec![1, 2, 2]);
    }

    #[test]
    fn pin_ring_zero_capacity_is_noop() {
        let ring = PinRing::new(0);
        let a = Counted::new(1);
        assert_eq!(ring.pin(a.clone()), 0);
        assert!(ring.is_empty());
        assert_eq!(a.pins(), 0);
        ring.debug_validate_invariants();
    }

    #[test]
    fn pin_ring_clear_releases_every_pin() {
        let ring = PinRing::new(4);
        let a = Counted::new(1);
        let b = Counted::new(2);
        ring.pin(a.clone());
        ring.pin(b.clone());
        ring.pin(a.clone());

        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(a.pins(), 0);
        assert_eq!(b.pins(), 0);

        // Clearing twice is harmless.
        ring.clear();
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn pin_ring_drops_trimmed_handle_outside_lock() {
        let ring = PinRing::new(1);
        let a = Counted::new(1);
        ring.pin(a.clone());
        ring.pin(Counted::new(2));
        // The ring no longer shares `a`.
        assert_eq!(Arc::strong_count(&a), 1);
    }

    #[test]
    fn pin_ring_bound_holds_under_contention() {
        let ring = Arc::new(PinRing::new(8));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..16)
            .map(|t| {
                let ring = ring.clone();
                let max_seen = max_seen.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        let len = ring.pin(Counted::new(t * 1000 + i));
                        max_seen.fetch_max(len, Ordering::Relaxed);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(max_seen.load(Ordering::Relaxed) <= 8);
        assert_eq!(ring.len(), 8);
        ring.debug_validate_invariants();
    }

    mod property_tests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// The ring always holds the last `min(n, cap)` pins, in order,
            /// and every item's counter equals its number of occurrences.
            #[test]
            fn prop_ring_matches_tail_of_history(
                capacity in 1usize..16,
                picks in prop::collection::vec(0usize..8, 0..200)
            ) {
                let items: Vec<_> = (0..8).map(Counted::new).collect();
                let ring = PinRing::new(capacity);
                for &pick in &picks {
                    let len = ring.pin(items[pick].clone());
                    prop_assert!(len <= capacity);
                }

                let start = picks.len().saturating_sub(capacity);
                let expected: Vec<usize> = picks[start..].to_vec();
                prop_assert_eq!(ids(&ring), expected.clone());

                for item in &items {
                    let occurrences = expected.iter().filter(|&&id| id == item.id).count();
                    prop_assert_eq!(item.pins(), occurrences);
                }
            }
        }
    }
}
