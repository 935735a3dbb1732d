use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::SoftCacheMetricsSnapshot;

/// Lock-free counters shared by every thread using one cache.
#[derive(Debug, Default)]
pub struct SoftCacheCounters {
    get_hits: AtomicU64,
    get_misses: AtomicU64,
    insert_new: AtomicU64,
    insert_updates: AtomicU64,
    removes: AtomicU64,
    reclaimed: AtomicU64,
    evicted: AtomicU64,
    swept: AtomicU64,
    cleaner_failures: AtomicU64,
    pressure_events: AtomicU64,
}

impl SoftCacheCounters {
    pub fn record_get_hit(&self) {
        self.get_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get_miss(&self) {
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insert_new(&self) {
        self.insert_new.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_insert_update(&self) {
        self.insert_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reclaimed(&self) {
        self.reclaimed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` slots released by one evictor pass.
    pub fn record_evicted(&self, count: u64) {
        self.reclaimed.fetch_add(count, Ordering::Relaxed);
        self.evicted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_swept(&self, count: u64) {
        self.swept.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_cleaner_failures(&self, count: u64) {
        self.cleaner_failures.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_pressure_event(&self) {
        self.pressure_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the counters; gauges are filled in by the caller.
    pub fn snapshot(&self) -> SoftCacheMetricsSnapshot {
        SoftCacheMetricsSnapshot {
            get_hits: self.get_hits.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            insert_new: self.insert_new.load(Ordering::Relaxed),
            insert_updates: self.insert_updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
            cleaner_failures: self.cleaner_failures.load(Ordering::Relaxed),
            pressure_events: self.pressure_events.load(Ordering::Relaxed),
            ..SoftCacheMetricsSnapshot::default()
        }
    }
}
