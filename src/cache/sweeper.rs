//! Deferred removal of reclaimed slots.
//!
//! A slot that transitions to `Reclaimed` is pushed onto a lock-free queue by
//! whichever thread performed the transition. Draining operations pop the
//! queue and remove each slot's table entry, but only while the table still
//! maps the key to that very slot. A key that was re-inserted in the meantime
//! keeps its new slot.
//!
//! ```text
//!   reclaim ──► SegQueue<Arc<Slot>> ──► drain ──► remove_if_same(key, slot)
//! ```
//!
//! The evictor lives here as well: it gathers unpinned candidates under shard
//! read locks, detaches them only after re-checking their pin counts with the
//! pin ring locked, then runs the cleaners and queues the slots after every
//! lock is released.
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;

use crossbeam_queue::SegQueue;

use crate::ds::pin_ring::PinRing;
use crate::store::slot::{CleanOutcome, Slot};
use crate::store::table::SlotTable;

/// Result of one evictor pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EvictionPass {
    pub released: usize,
    pub cleaner_failures: usize,
}

/// Queue of reclaimed slots awaiting removal from the table.
pub(crate) struct Sweeper<K, V> {
    pending: SegQueue<Arc<Slot<K, V>>>,
}

impl<K, V> Sweeper<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            pending: SegQueue::new(),
        }
    }

    /// Queues a slot that has just been reclaimed.
    pub(crate) fn enqueue(&self, slot: Arc<Slot<K, V>>) {
        self.pending.push(slot);
    }

    /// Number of reclaimed slots not yet swept.
    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<K, V> Sweeper<K, V>
where
    K: Eq + Hash,
{
    /// Removes the table entry of every queued slot that is still installed.
    ///
    /// Returns the number of entries actually removed. Slots whose key was
    /// overwritten or removed are simply dropped.
    pub(crate) fn drain<S: BuildHasher>(&self, table: &SlotTable<K, V, S>) -> usize {
        let mut swept = 0;
        while let Some(slot) = self.pending.pop() {
            if table.remove_if_same(slot.key(), &slot) {
                swept += 1;
            }
        }
        if swept > 0 {
            tracing::trace!(swept, "swept reclaimed entries");
        }
        swept
    }

    /// Releases up to `budget` unpinned live slots, scanning from shard
    /// `start`.
    ///
    /// Candidates are collected under shard read locks alone. The pin ring
    /// lock is then taken only to re-check each candidate's pin count and
    /// detach it, so pinners wait on the candidates, never on the scan.
    /// Cleaners run after every lock is released, and the released slots are
    /// queued for the next drain.
    pub(crate) fn evict<S: BuildHasher>(
        &self,
        table: &SlotTable<K, V, S>,
        ring: &PinRing<Arc<Slot<K, V>>>,
        budget: usize,
        start: usize,
    ) -> EvictionPass {
        if budget == 0 {
            return EvictionPass::default();
        }

        let mut candidates = Vec::new();
        table.scan_from(start, |slot| {
            if slot.pin_count() == 0 && slot.is_live() {
                candidates.push(Arc::clone(slot));
            }
            candidates.len() < budget
        });
        if candidates.is_empty() {
            return EvictionPass::default();
        }

        let victims: Vec<_> = ring.with_locked(|_pinned| {
            candidates
                .iter()
                .filter_map(|slot| slot.detach_if_unpinned().map(|value| (Arc::clone(slot), value)))
                .collect()
        });
        drop(candidates);

        let mut pass = EvictionPass {
            released: victims.len(),
            cleaner_failures: 0,
        };
        for (slot, value) in victims {
            if slot.clean(&value) == CleanOutcome::Failed {
                pass.cleaner_failures += 1;
            }
            self.enqueue(slot);
        }
        pass
    }
}
