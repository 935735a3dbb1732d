//! Sharded concurrent slot table.
//!
//! ## Architecture
//! - Keys map to `Arc<Slot<K, V>>` in one of N `RwLock<HashMap>` shards.
//! - The shard is picked with `FxBuildHasher`, independently of the map
//!   hasher `S`, so keys in one shard still spread over the inner table.
//! - Every operation locks exactly one shard for one map operation; no lock is
//!   held across calls, and no shard lock is ever held while another is taken
//!   except by [`clear`](SlotTable::clear).
//!
//! ## Core Operations
//! - `get` / `contains_key`: shared lock on one shard.
//! - `insert`: installs a new slot, returning the slot it replaced.
//! - `remove`: unconditional removal by key.
//! - `remove_if_same`: removal guarded by slot identity, used by the sweeper
//!   and by lazy cleanup so a re-inserted live slot is never dropped.
//! - `shard_snapshot`: copies one shard's entries for lock-free iteration.
//!
//! ## Thread Safety
//! - `SlotTable` is `Send + Sync` when `K`, `V` and `S` are.
//! - `len` is a relaxed counter and may be stale by the time it is read.
use std::collections::HashMap;
use std::collections::hash_map::{Entry, RandomState};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxBuildHasher;

use crate::store::slot::Slot;

/// A table shard.
type Shard<K, V, S> = RwLock<HashMap<K, Arc<Slot<K, V>>, S>>;

/// Concurrent `K -> Arc<Slot<K, V>>` map with per-shard locking.
pub struct SlotTable<K, V, S = RandomState> {
    shards: Box<[Shard<K, V, S>]>,
    size: AtomicUsize,
    selector: FxBuildHasher,
}

impl<K, V> SlotTable<K, V, RandomState>
where
    K: Eq + Hash,
{
    /// Creates a table with `shards` shards and the default hasher.
    pub fn new(shards: usize) -> Self {
        Self::with_hasher(shards, RandomState::new())
    }
}

impl<K, V, S> SlotTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Creates a table with `shards` shards and a custom map hasher.
    ///
    /// The shard count is clamped to at least 1.
    pub fn with_hasher(shards: usize, hasher: S) -> Self {
        let shard_count = shards.max(1);
        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::with_hasher(hasher.clone())))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            size: AtomicUsize::new(0),
            selector: FxBuildHasher,
        }
    }
}

impl<K, V, S> SlotTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Returns the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Computes the shard index for a key.
    fn shard_index(&self, key: &K) -> usize {
        (self.selector.hash_one(key) as usize) % self.shards.len()
    }

    fn shard(&self, key: &K) -> &Shard<K, V, S> {
        &self.shards[self.shard_index(key)]
    }

    /// Returns the slot installed for `key`.
    pub fn get(&self, key: &K) -> Option<Arc<Slot<K, V>>> {
        self.shard(key).read().get(key).cloned()
    }

    /// Returns `true` if `key` has an installed slot, live or not.
    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Returns `true` if `slot` is the slot currently installed for `key`.
    pub fn is_current(&self, key: &K, slot: &Arc<Slot<K, V>>) -> bool {
        self.shard(key)
            .read()
            .get(key)
            .is_some_and(|installed| Arc::ptr_eq(installed, slot))
    }

    /// Installs `slot` for `key`, returning the slot it replaced.
    pub fn insert(&self, key: K, slot: Arc<Slot<K, V>>) -> Option<Arc<Slot<K, V>>> {
        let mut map = self.shard(&key).write();
        match map.entry(key) {
            Entry::Occupied(mut entry) => Some(entry.insert(slot)),
            Entry::Vacant(entry) => {
                entry.insert(slot);
                self.size.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// Removes the slot installed for `key`.
    pub fn remove(&self, key: &K) -> Option<Arc<Slot<K, V>>> {
        let removed = self.shard(key).write().remove(key);
        if removed.is_some() {
            self.size.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Removes the entry for `key` only if it still holds `slot`.
    ///
    /// Returns `true` if the entry was removed.
    pub fn remove_if_same(&self, key: &K, slot: &Arc<Slot<K, V>>) -> bool {
        let mut map = self.shard(key).write();
        let same = map
            .get(key)
            .is_some_and(|installed| Arc::ptr_eq(installed, slot));
        if !same {
            return false;
        }
        let removed = map.remove(key);
        drop(map);
        self.size.fetch_sub(1, Ordering::Relaxed);
        drop(removed);
        true
    }

    /// Returns the number of installed slots.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Returns `true` if no slot is installed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry.
    ///
    /// Shards are locked together so no reader sees a half-cleared table.
    /// Removed slots are dropped after every lock is released.
    pub fn clear(&self) {
        let mut removed = Vec::new();
        {
            let mut guards: Vec<_> = self.shards.iter().map(|shard| shard.write()).collect();
            for guard in guards.iter_mut() {
                removed.extend(guard.drain());
            }
            self.size.store(0, Ordering::Relaxed);
        }
        drop(removed);
    }

    /// Runs `f` on every installed slot, one shard at a time under its read
    /// lock. `f` must not touch the table.
    pub fn for_each_slot(&self, mut f: impl FnMut(&K, &Arc<Slot<K, V>>)) {
        for shard in self.shards.iter() {
            for (key, slot) in shard.read().iter() {
                f(key, slot);
            }
        }
    }

    /// Visits slots starting at shard `start`, wrapping around, until `f`
    /// returns `false`. Used by the evictor to spread victims over shards.
    pub fn scan_from(&self, start: usize, mut f: impl FnMut(&Arc<Slot<K, V>>) -> bool) {
        let count = self.shards.len();
        for offset in 0..count {
            let shard = self.shards[(start + offset) % count].read();
            for slot in shard.values() {
                if !f(slot) {
                    return;
                }
            }
        }
    }
}

impl<K, V, S> SlotTable<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    /// Copies the entries of shard `index`, or returns `None` past the last
    /// shard. The shard lock is released before returning.
    pub fn shard_snapshot(&self, index: usize) -> Option<Vec<(K, Arc<Slot<K, V>>)>> {
        let shard = self.shards.get(index)?.read();
        Some(
            shard
                .iter()
                .map(|(key, slot)| (key.clone(), Arc::clone(slot)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(key: &'static str, value: u32) -> Arc<Slot<&'static str, u32>> {
        Arc::new(Slot::new(key, Arc::new(value), None))
    }

    #[test]
    fn table_basic_ops() {
        let table = SlotTable::new(4);
        let a = slot("a", 1);
        assert!(table.insert("a", a.clone()).is_none());
        assert!(table.contains_key(&"a"));
        assert!(table.is_current(&"a", &a));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&"a").and_then(|s| s.value()).as_deref(), Some(&1));

        let removed = table.remove(&"a").unwrap();
        assert!(Arc::ptr_eq(&removed, &a));
        assert!(!table.contains_key(&"a"));
        assert!(table.is_empty());
    }

    #[test]
    fn table_insert_returns_replaced_slot() {
        let table = SlotTable::new(2);
        let first = slot("k", 1);
        let second = slot("k", 2);
        table.insert("k", first.clone());
        let replaced = table.insert("k", second.clone()).unwrap();
        assert!(Arc::ptr_eq(&replaced, &first));
        assert_eq!(table.len(), 1);
        assert!(table.is_current(&"k", &second));
    }

    #[test]
    fn remove_if_same_ignores_newer_slot() {
        let table = SlotTable::new(2);
        let stale = slot("k", 1);
        let fresh = slot("k", 2);
        table.insert("k", stale.clone());
        table.insert("k", fresh.clone());

        assert!(!table.remove_if_same(&"k", &stale));
        assert!(table.is_current(&"k", &fresh));
        assert_eq!(table.len(), 1);

        assert!(table.remove_if_same(&"k", &fresh));
        assert!(table.is_empty());
        assert!(!table.remove_if_same(&"k", &fresh));
    }

    #[test]
    fn zero_shards_is_clamped() {
        let table: SlotTable<u64, u64> = SlotTable::new(0);
        assert_eq!(table.shard_count(), 1);
    }

    #[test]
    fn clear_and_snapshots() {
        let table = SlotTable::new(3);
        for (i, key) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
            table.insert(key, slot(key, i as u32));
        }

        let mut keys: Vec<_> = (0..table.shard_count())
            .filter_map(|i| table.shard_snapshot(i))
            .flatten()
            .map(|(key, _)| key)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
        assert!(table.shard_snapshot(table.shard_count()).is_none());

        let mut visited = 0;
        table.for_each_slot(|key, slot| {
            assert_eq!(key, slot.key());
            visited += 1;
        });
        assert_eq!(visited, 5);

        table.clear();
        assert!(table.is_empty());
        table.clear();
        assert_eq!(table.len(), 0);
    }

    #[test]
    fn scan_from_stops_when_asked() {
        let table = SlotTable::new(4);
        for i in 0..32u64 {
            table.insert(i, Arc::new(Slot::new(i, Arc::new(i), None)));
        }
        let mut seen = 0;
        table.scan_from(3, |_| {
            seen += 1;
            seen < 10
        });
        assert_eq!(seen, 10);

        let mut all = 0;
        table.scan_from(7, |_| {
            all += 1;
            true
        });
        assert_eq!(all, 32);
    }
}
