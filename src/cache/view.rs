//! Iteration over live entries.
//!
//! Iterators never hold a lock between calls. They copy one shard at a time
//! (a short read lock) and, before yielding an entry, check that its slot is
//! still live and still the one installed for its key.
//!
//! ## Consistency
//! - Entries removed, overwritten or reclaimed before they are reached are
//!   skipped.
//! - Entries added after the iterator was created may or may not appear.
//! - Concurrent mutation never makes an iterator panic.
//! - Iteration does not pin and does not drain.
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::sync::Arc;
use std::vec;

use crate::cache::SoftCache;
use crate::store::slot::Slot;
use crate::store::table::SlotTable;

/// Iterator over `(key, value)` pairs of live entries.
pub struct Iter<'a, K, V, S = RandomState> {
    table: &'a SlotTable<K, V, S>,
    next_shard: usize,
    current: vec::IntoIter<(K, Arc<Slot<K, V>>)>,
    last: Option<(K, Arc<Slot<K, V>>)>,
}

impl<'a, K, V, S> Iter<'a, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    pub(crate) fn new(table: &'a SlotTable<K, V, S>) -> Self {
        Self {
            table,
            next_shard: 0,
            current: Vec::new().into_iter(),
            last: None,
        }
    }

    /// Removes the entry most recently yielded by this iterator.
    ///
    /// Returns `false` if nothing was yielded yet, if it was already removed
    /// through this method, or if the key has since been overwritten or
    /// removed by someone else; a newer entry for the key is never touched.
    pub fn remove_last(&mut self) -> bool {
        match self.last.take() {
            Some((key, slot)) => self.table.remove_if_same(&key, &slot),
            None => false,
        }
    }
}

impl<K, V, S> Iterator for Iter<'_, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    type Item = (K, Arc<V>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((key, slot)) = self.current.next() {
                let Some(value) = slot.value() else {
                    continue;
                };
                if !self.table.is_current(&key, &slot) {
                    continue;
                }
                self.last = Some((key.clone(), slot));
                return Some((key, value));
            }

            let snapshot = self.table.shard_snapshot(self.next_shard)?;
            self.next_shard += 1;
            self.current = snapshot.into_iter();
        }
    }
}

impl<K, V, S> FusedIterator for Iter<'_, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
}

/// Iterator over the keys of live entries.
pub struct Keys<'a, K, V, S = RandomState> {
    inner: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Keys<'a, K, V, S> {
    pub(crate) fn new(inner: Iter<'a, K, V, S>) -> Self {
        Self { inner }
    }
}

impl<K, V, S> Iterator for Keys<'_, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(key, _)| key)
    }
}

impl<K, V, S> FusedIterator for Keys<'_, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
}

/// Iterator over live values.
pub struct Values<'a, K, V, S = RandomState> {
    inner: Iter<'a, K, V, S>,
}

impl<'a, K, V, S> Values<'a, K, V, S> {
    pub(crate) fn new(inner: Iter<'a, K, V, S>) -> Self {
        Self { inner }
    }
}

impl<K, V, S> Iterator for Values<'_, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    type Item = Arc<V>;

    fn next(&mut self) -> Option<Arc<V>> {
        self.inner.next().map(|(_, value)| value)
    }
}

impl<K, V, S> FusedIterator for Values<'_, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
}

/// Set-like view over a cache's entries.
///
/// Reads through to the cache; nothing is copied until asked. Bulk
/// operations hold the cache's compound lock.
pub struct Entries<'a, K, V, S = RandomState> {
    cache: &'a SoftCache<K, V, S>,
}

impl<'a, K, V, S> Entries<'a, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    pub(crate) fn new(cache: &'a SoftCache<K, V, S>) -> Self {
        Self { cache }
    }

    pub fn iter(&self) -> Iter<'a, K, V, S> {
        self.cache.iter()
    }

    /// Number of table entries; see [`SoftCache::len`].
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Returns `true` if `key` currently maps to a live value equal to
    /// `value`.
    pub fn contains(&self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.cache
            .peek(key)
            .is_some_and(|current| *current == *value)
    }

    /// Returns `true` if every pair is contained.
    pub fn contains_all<'b, I>(&self, pairs: I) -> bool
    where
        V: PartialEq + 'b,
        K: 'b,
        I: IntoIterator<Item = (&'b K, &'b V)>,
    {
        let _compound = self.cache.compound.lock();
        pairs
            .into_iter()
            .all(|(key, value)| self.contains(key, value))
    }

    /// Removes `key` only if it maps to a live value equal to `value`.
    pub fn remove(&self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        let _compound = self.cache.compound.lock();
        let Some(slot) = self.cache.table.get(key) else {
            return false;
        };
        let matches = slot.value().is_some_and(|current| *current == *value);
        matches && self.cache.table.remove_if_same(key, &slot)
    }

    /// Removes every live entry for which `keep` returns `false`.
    ///
    /// Returns the number of entries removed.
    pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) -> usize {
        let _compound = self.cache.compound.lock();
        let mut removed = 0;
        let mut iter = self.cache.iter();
        while let Some((key, value)) = iter.next() {
            if !keep(&key, &value) && iter.remove_last() {
                removed += 1;
            }
        }
        removed
    }

    /// Inserts every pair; see [`SoftCache::insert_all`].
    pub fn extend(&self, pairs: impl IntoIterator<Item = (K, V)>) {
        self.cache.insert_all(pairs);
    }

    /// Clears the cache; see [`SoftCache::clear`].
    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Copies every live entry.
    pub fn to_vec(&self) -> Vec<(K, Arc<V>)> {
        self.cache.snapshot()
    }
}

impl<'a, K, V, S> IntoIterator for &Entries<'a, K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    type Item = (K, Arc<V>);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a SoftCache<K, V, S>
where
    K: Eq + Hash + Clone,
    S: BuildHasher,
{
    type Item = (K, Arc<V>);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> fmt::Debug for Entries<'_, K, V, S>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: fmt::Debug,
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let _compound = self.cache.compound.lock();
        f.debug_list().entries(self.cache.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SoftCacheBuilder;

    fn filled(n: u32) -> SoftCache<u32, u32> {
        let cache = SoftCache::with_pin_capacity(4);
        for i in 0..n {
            cache.insert(i, i * 10);
        }
        cache
    }

    #[test]
    fn iter_yields_live_entries_once() {
        let cache = filled(100);
        let mut keys: Vec<_> = cache.keys().collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..100).collect::<Vec<_>>());

        let total: u32 = cache.values().map(|v| *v).sum();
        assert_eq!(total, (0..100).map(|i| i * 10).sum());
    }

    #[test]
    fn iter_skips_reclaimed_and_removed() {
        let cache = filled(10);
        cache.reclaim(&3);
        let mut iter = cache.iter();
        cache.remove(&5);

        let mut keys: Vec<_> = iter.by_ref().map(|(k, _)| k).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![0, 1, 2, 4, 6, 7, 8, 9]);
        assert!(iter.next().is_none());
    }

    #[test]
    fn iter_skips_entries_overwritten_after_snapshot() {
        let cache: SoftCache<u32, u32> = SoftCacheBuilder::new().pin_capacity(2).shards(1).build();
        for i in 0..5 {
            cache.insert(i, i);
        }
        let mut iter = cache.iter();
        let (first, _) = iter.next().unwrap();
        for i in 0..5 {
            if i != first {
                cache.insert(i, 100 + i);
            }
        }
        // the copied shard still names the old slots, which are no longer
        // installed
        assert!(iter.next().is_none());
    }

    #[test]
    fn remove_last_is_identity_guarded() {
        let cache = filled(3);
        let mut iter = cache.iter();
        assert!(!iter.remove_last());

        let (key, _) = iter.next().unwrap();
        cache.insert(key, 999);
        assert!(!iter.remove_last());
        assert_eq!(cache.get(&key).as_deref(), Some(&999));

        let (key, _) = iter.next().unwrap();
        assert!(iter.remove_last());
        assert!(!iter.remove_last());
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn entries_view_operations() {
        let cache = filled(6);
        let entries = cache.entries();
        assert_eq!(entries.len(), 6);
        assert!(entries.contains(&2, &20));
        assert!(!entries.contains(&2, &21));
        assert!(entries.contains_all([(&1, &10), (&3, &30)]));
        assert!(!entries.contains_all([(&1, &10), (&3, &31)]));

        assert!(!entries.remove(&4, &41));
        assert!(entries.remove(&4, &40));
        assert!(!cache.contains_key(&4));

        let removed = entries.retain(|k, _| k % 2 == 0);
        assert_eq!(removed, 3);
        let mut left: Vec<_> = entries.to_vec().into_iter().map(|(k, v)| (k, *v)).collect();
        left.sort_unstable();
        assert_eq!(left, vec![(0, 0), (2, 20)]);

        entries.extend([(8, 80)]);
        assert_eq!((&entries).into_iter().count(), 3);
        assert_eq!(format!("{:?}", cache.entries()).matches('(').count(), 3);

        entries.clear();
        assert!(entries.is_empty());
    }

    #[test]
    fn cache_ref_into_iter() {
        let cache = filled(4);
        let mut seen = 0;
        for (key, value) in &cache {
            assert_eq!(*value, key * 10);
            seen += 1;
        }
        assert_eq!(seen, 4);
    }
}
