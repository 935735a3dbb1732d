//! Thread-safe cache with hard and soft retention.
//!
//! Holds an unbounded set of keys while keeping only a bounded number of
//! values strongly retained. The `pin_capacity` most recently touched values
//! are *pinned*; every other value is *evictable* and may be released by the
//! reclamation strategy, by memory pressure, or by an explicit
//! [`reclaim`](SoftCache::reclaim). A released entry reads as absent; it never
//! produces an error.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────── SoftCache ────────────────────────────────┐
//!   │                                                                            │
//!   │  SlotTable (sharded RwLock<HashMap<K, Arc<Slot>>>)                         │
//!   │     │                                                                      │
//!   │     ├── Slot { key, Live(Arc<V>) | Reclaimed, pins, cleaner }              │
//!   │     │      ▲                                                               │
//!   │     │      │ pin / trim                                                    │
//!   │  PinRing (Mutex<VecDeque<Arc<Slot>>>, len <= pin_capacity)                 │
//!   │                                                                            │
//!   │  Sweeper (SegQueue<Arc<Slot>>) ◄── evictor / reclaim()                     │
//!   │     └── drain: remove_if_same(key, slot) at the start of every mutation    │
//!   │                                                                            │
//!   │  ReclaimStrategy + MemoryPressure: how many unpinned values to release    │
//!   └────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operation Flow
//!
//! `get`, `insert`, `remove` and `clear` first *drain*: queued reclaimed slots
//! are swept out of the table, the strategy is asked for a budget and, if it
//! is non-zero, up to that many unpinned values are released. Then the call
//! operates on the table and, when it touched a live value, pins it.
//!
//! | Operation             | Drains | Pins | Lock                         |
//! |-----------------------|--------|------|------------------------------|
//! | `get`                 | yes    | hit  | one shard, ring              |
//! | `insert`/`insert_arc` | yes    | yes  | one shard, ring              |
//! | `remove`              | yes    | no   | one shard                    |
//! | `clear`               | yes    | no   | ring, all shards             |
//! | `peek`/`contains_key` | no     | no   | one shard                    |
//! | `contains_value`      | no     | no   | compound, one shard at a time|
//! | `insert_all`/`extend` | once   | yes  | compound, per insert         |
//! | `iter`/`keys`/`values`| no     | no   | one shard at a time          |
//!
//! ## Thread Safety
//! - `SoftCache` is `Send + Sync` when `K` and `V` are.
//! - Lock order when nested: pin ring, then slot payload. The compound lock
//!   is always taken first. Shard locks are never held under the ring lock.
//! - `get` and `insert` pin a slot before reading or publishing it, so an
//!   eviction pass never releases the value they hand back.
//! - Cleaners run with no cache lock held, so a cleaner may call back into
//!   the cache.
//!
//! ## Example Usage
//!
//! ```
//! use softcache::cache::SoftCache;
//!
//! let cache: SoftCache<String, Vec<u8>> = SoftCache::with_pin_capacity(2);
//! assert!(cache.insert("a".to_string(), vec![1]).is_none());
//! let previous = cache.insert("a".to_string(), vec![2]);
//! assert_eq!(previous.as_deref(), Some(&vec![1]));
//!
//! assert_eq!(cache.get(&"a".to_string()).as_deref(), Some(&vec![2]));
//! assert!(cache.pinned_len() <= cache.pin_capacity());
//!
//! // Simulate the host reclaiming the value.
//! assert!(cache.reclaim(&"a".to_string()));
//! assert!(cache.get(&"a".to_string()).is_none());
//! ```
pub(crate) mod sweeper;
pub mod view;

use std::collections::HashMap;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::builder::SoftCacheBuilder;
use crate::cache::sweeper::Sweeper;
use crate::ds::pin_ring::PinRing;
use crate::error::{CacheError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::counters::SoftCacheCounters;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::SoftCacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::policy::pressure::PressureWatch;
use crate::policy::reclaim::{ReclaimState, ReclaimStrategy};
use crate::store::slot::{CleanOutcome, SharedCleaner, Slot};
use crate::store::table::SlotTable;

pub use view::{Entries, Iter, Keys, Values};

/// Number of values pinned when no capacity is configured.
pub const DEFAULT_PIN_CAPACITY: usize = 20;

/// Everything a [`SoftCache`] is assembled from; produced by the builder.
pub(crate) struct CacheParts<K, V, S> {
    pub pin_capacity: usize,
    pub shards: usize,
    pub hasher: S,
    pub cleaner: Option<SharedCleaner<K, V>>,
    pub strategy: Box<dyn ReclaimStrategy>,
    pub pressure: Option<PressureWatch>,
}

/// Concurrent map that pins recently used values and lets the rest be
/// reclaimed.
pub struct SoftCache<K, V, S = RandomState> {
    table: SlotTable<K, V, S>,
    ring: PinRing<Arc<Slot<K, V>>>,
    sweeper: Sweeper<K, V>,
    /// Serializes compound operations (bulk insert, equality, snapshots).
    compound: Mutex<()>,
    cleaner: Option<SharedCleaner<K, V>>,
    strategy: Box<dyn ReclaimStrategy>,
    pressure: Option<PressureWatch>,
    /// Shard the next evictor pass starts from.
    evict_cursor: AtomicUsize,
    #[cfg(feature = "metrics")]
    counters: SoftCacheCounters,
}

impl<K, V> SoftCache<K, V, RandomState>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with the default configuration: 20 pinned values,
    /// reclamation on memory pressure only.
    pub fn new() -> Self {
        SoftCacheBuilder::new().build()
    }

    /// Creates a cache that pins up to `pin_capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if `pin_capacity` is zero. Use
    /// [`SoftCacheBuilder::try_build`] to handle that case.
    pub fn with_pin_capacity(pin_capacity: usize) -> Self {
        SoftCacheBuilder::new().pin_capacity(pin_capacity).build()
    }

    /// Returns a builder for a custom configuration.
    pub fn builder() -> SoftCacheBuilder<K, V> {
        SoftCacheBuilder::new()
    }
}

impl<K, V> Default for SoftCache<K, V, RandomState>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SoftCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher + Clone,
{
    pub(crate) fn from_parts(parts: CacheParts<K, V, S>) -> Self {
        Self {
            table: SlotTable::with_hasher(parts.shards, parts.hasher),
            ring: PinRing::new(parts.pin_capacity),
            sweeper: Sweeper::new(),
            compound: Mutex::new(()),
            cleaner: parts.cleaner,
            strategy: parts.strategy,
            pressure: parts.pressure,
            evict_cursor: AtomicUsize::new(0),
            #[cfg(feature = "metrics")]
            counters: SoftCacheCounters::default(),
        }
    }
}

impl<K, V, S> SoftCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Returns the value for `key` and pins it, or `None` if the key is
    /// unknown or its value was reclaimed.
    ///
    /// A reclaimed entry found here is removed on the spot.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.drain();
        let Some(slot) = self.table.get(key) else {
            #[cfg(feature = "metrics")]
            self.counters.record_get_miss();
            return None;
        };

        // Pin before reading so the evictor cannot release the value between
        // the read and the pin. A dead slot pinned here ages out of the ring.
        self.ring.pin(Arc::clone(&slot));
        match slot.value() {
            Some(value) => {
                #[cfg(feature = "metrics")]
                self.counters.record_get_hit();
                Some(value)
            },
            None => {
                self.table.remove_if_same(key, &slot);
                #[cfg(feature = "metrics")]
                self.counters.record_get_miss();
                None
            },
        }
    }

    /// Returns the live value for `key` without draining or pinning.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.table.get(key).and_then(|slot| slot.value())
    }

    /// Returns the value for `key`, computing and inserting it on a miss.
    ///
    /// Not atomic: two threads missing at once both run `make`, and the later
    /// insert wins.
    pub fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> Arc<V> {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = Arc::new(make());
        self.insert_arc(key, Arc::clone(&value));
        value
    }

    /// Stores `value` under `key` and pins it.
    ///
    /// Returns the previous value if it was still live. Replacing a value
    /// never runs the cleaner on it.
    pub fn insert(&self, key: K, value: V) -> Option<Arc<V>> {
        self.insert_arc(key, Arc::new(value))
    }

    /// Like [`insert`](Self::insert) for a value that is already shared.
    pub fn insert_arc(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        self.drain();
        self.install(key, value)
    }

    /// Like [`insert`](Self::insert) for a caller holding an optional value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NullArgument`] if `value` is `None`; the cache
    /// is left untouched.
    pub fn try_insert(&self, key: K, value: Option<V>) -> Result<Option<Arc<V>>, CacheError> {
        let value = value.ok_or(CacheError::NullArgument { argument: "value" })?;
        Ok(self.insert(key, value))
    }

    /// Inserts every pair from `entries` as one compound operation.
    pub fn insert_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        self.drain();
        let _compound = self.compound.lock();
        for (key, value) in entries {
            self.install(key, Arc::new(value));
        }
    }

    fn install(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let slot = Arc::new(Slot::new(key.clone(), value, self.cleaner.clone()));
        // Pinned before it is published, so no eviction pass sees it unpinned.
        self.ring.pin(Arc::clone(&slot));
        let replaced = self.table.insert(key, slot);

        let Some(old) = replaced else {
            #[cfg(feature = "metrics")]
            self.counters.record_insert_new();
            return None;
        };
        #[cfg(feature = "metrics")]
        self.counters.record_insert_update();
        old.value()
    }

    /// Removes `key`, returning its value if it was still live.
    ///
    /// Pins on the removed value stay in the ring until they age out.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.drain();
        let removed = self.table.remove(key)?;
        #[cfg(feature = "metrics")]
        self.counters.record_remove();
        removed.value()
    }

    /// Removes every entry and releases every pin. Idempotent.
    ///
    /// Values are dropped, not reclaimed; the cleaner is not called.
    pub fn clear(&self) {
        self.ring.clear();
        self.sweep();
        self.table.clear();
    }

    /// Returns `true` if `key` maps to a live value.
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.get(key).is_some_and(|slot| slot.is_live())
    }

    /// Returns `true` if any live entry holds a value equal to `value`.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let _compound = self.compound.lock();
        self.iter().any(|(_, candidate)| *candidate == *value)
    }

    /// Like [`contains_value`](Self::contains_value) for an optional value.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NullArgument`] if `value` is `None`.
    pub fn try_contains_value(&self, value: Option<&V>) -> Result<bool, CacheError>
    where
        V: PartialEq,
    {
        let value = value.ok_or(CacheError::NullArgument { argument: "value" })?;
        Ok(self.contains_value(value))
    }

    /// Number of table entries, including reclaimed entries not yet swept.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the table holds no entry.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Maximum number of pinned values.
    pub fn pin_capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Number of pin-ring entries currently held.
    pub fn pinned_len(&self) -> usize {
        self.ring.len()
    }

    /// Number of reclaimed entries waiting for the next drain.
    pub fn pending_reclaims(&self) -> usize {
        self.sweeper.pending()
    }

    /// Iterates over live entries. See [`Iter`] for the consistency model.
    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter::new(&self.table)
    }

    /// Iterates over the keys of live entries.
    pub fn keys(&self) -> Keys<'_, K, V, S> {
        Keys::new(self.iter())
    }

    /// Iterates over live values.
    pub fn values(&self) -> Values<'_, K, V, S> {
        Values::new(self.iter())
    }

    /// Returns a view over the cache's entries.
    pub fn entries(&self) -> Entries<'_, K, V, S> {
        Entries::new(self)
    }

    /// Copies every live entry while holding the compound lock.
    pub fn snapshot(&self) -> Vec<(K, Arc<V>)> {
        let _compound = self.compound.lock();
        self.iter().collect()
    }

    /// Releases the value stored under `key` regardless of pins, as a
    /// memory-constrained host would. The cleaner runs on the calling thread.
    ///
    /// Returns `true` if this call performed the release. The entry is swept
    /// from the table on the next draining operation.
    pub fn reclaim(&self, key: &K) -> bool {
        let Some(slot) = self.table.get(key) else {
            return false;
        };
        let Some(outcome) = slot.reclaim() else {
            return false;
        };

        #[cfg(feature = "metrics")]
        self.counters.record_reclaimed();
        if outcome == CleanOutcome::Failed {
            #[cfg(feature = "metrics")]
            self.counters.record_cleaner_failures(1);
        }

        self.sweeper.enqueue(slot);
        true
    }

    /// Releases every unpinned value now and sweeps the released entries.
    ///
    /// Returns the number of values released.
    pub fn release_unpinned(&self) -> usize {
        let released = self.evict(usize::MAX);
        self.sweep();
        released
    }

    /// Verifies internal consistency. Only meaningful while no other thread
    /// mutates the cache.
    ///
    /// # Errors
    ///
    /// Returns an [`InvariantError`] describing the first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let (ring_len, counts_match) = self.ring.with_locked(|ring| {
            let mut occurrences: HashMap<*const Slot<K, V>, (usize, usize)> = HashMap::new();
            for slot in ring.iter() {
                let entry = occurrences
                    .entry(Arc::as_ptr(slot))
                    .or_insert((0, slot.pin_count()));
                entry.0 += 1;
            }
            (ring.len(), occurrences.into_values().all(|(seen, pins)| seen == pins))
        });
        if ring_len > self.ring.capacity() {
            return Err(InvariantError::new(format!(
                "pin ring holds {} entries, capacity is {}",
                ring_len,
                self.ring.capacity()
            )));
        }
        if !counts_match {
            return Err(InvariantError::new(
                "slot pin count differs from its pin ring occurrences",
            ));
        }

        let mut entries = 0;
        let mut key_mismatch = false;
        self.table.for_each_slot(|key, slot| {
            entries += 1;
            key_mismatch |= key != slot.key();
        });
        if key_mismatch {
            return Err(InvariantError::new("table key differs from its slot's key"));
        }
        if entries != self.table.len() {
            return Err(InvariantError::new(format!(
                "table reports {} entries, holds {}",
                self.table.len(),
                entries
            )));
        }
        Ok(())
    }

    /// Sweeps, consults the strategy and releases values if it asks to.
    fn drain(&self) {
        self.sweep();

        let under_pressure = self.pressure.as_ref().is_some_and(PressureWatch::poll);
        let budget = self.strategy.budget(&ReclaimState {
            entries: self.table.len(),
            pin_capacity: self.ring.capacity(),
            under_pressure,
        });
        if under_pressure {
            tracing::debug!(budget, "memory pressure signalled");
            #[cfg(feature = "metrics")]
            self.counters.record_pressure_event();
        }

        if budget > 0 && self.evict(budget) > 0 {
            self.sweep();
        }
    }

    fn sweep(&self) -> usize {
        let swept = self.sweeper.drain(&self.table);
        #[cfg(feature = "metrics")]
        self.counters.record_swept(swept as u64);
        swept
    }

    fn evict(&self, budget: usize) -> usize {
        let start = self.evict_cursor.fetch_add(1, Ordering::Relaxed) % self.table.shard_count();
        let pass = self.sweeper.evict(&self.table, &self.ring, budget, start);
        if pass.released > 0 {
            tracing::debug!(
                released = pass.released,
                cleaner_failures = pass.cleaner_failures,
                "released unpinned entries"
            );
        }

        #[cfg(feature = "metrics")]
        self.counters.record_evicted(pass.released as u64);
        #[cfg(feature = "metrics")]
        self.counters
            .record_cleaner_failures(pass.cleaner_failures as u64);
        pass.released
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S> SoftCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Returns the counters together with the current gauges.
    pub fn metrics(&self) -> SoftCacheMetricsSnapshot {
        SoftCacheMetricsSnapshot {
            cache_len: self.len(),
            pinned_len: self.pinned_len(),
            pin_capacity: self.pin_capacity(),
            ..self.counters.snapshot()
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V, S> MetricsSnapshotProvider<SoftCacheMetricsSnapshot> for SoftCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    fn snapshot(&self) -> SoftCacheMetricsSnapshot {
        self.metrics()
    }
}

impl<K, V, S> Extend<(K, V)> for SoftCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.insert_all(iter);
    }
}

impl<K, V> FromIterator<(K, V)> for SoftCache<K, V, RandomState>
where
    K: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let cache = Self::new();
        cache.insert_all(iter);
        cache
    }
}

impl<K, V, S> PartialEq for SoftCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: PartialEq,
    S: BuildHasher,
{
    /// Two caches are equal when they hold the same live entries. Reads do
    /// not pin.
    fn eq(&self, other: &Self) -> bool {
        if ptr::eq(self, other) {
            return true;
        }
        let _compound = self.compound.lock();
        let mine: Vec<_> = self.iter().collect();
        mine.len() == other.iter().count()
            && mine
                .iter()
                .all(|(key, value)| other.peek(key).is_some_and(|theirs| *theirs == **value))
    }
}

impl<K, V, S> Eq for SoftCache<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> fmt::Debug for SoftCache<K, V, S>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _compound = self.compound.lock();
        f.debug_map().entries(self.iter()).finish()
    }
}
