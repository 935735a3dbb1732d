/// Point-in-time copy of a cache's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SoftCacheMetricsSnapshot {
    pub get_hits: u64,
    pub get_misses: u64,

    pub insert_new: u64,
    pub insert_updates: u64,
    pub removes: u64,

    /// Slots moved to `Reclaimed`, whoever triggered it.
    pub reclaimed: u64,
    /// Subset of `reclaimed` released by the evictor.
    pub evicted: u64,
    /// Reclaimed entries removed from the table by the sweeper.
    pub swept: u64,
    pub cleaner_failures: u64,
    pub pressure_events: u64,

    // gauges captured at snapshot time
    pub cache_len: usize,
    pub pinned_len: usize,
    pub pin_capacity: usize,
}

impl SoftCacheMetricsSnapshot {
    /// Fraction of `get` calls that found a live value, or `0.0` before the
    /// first lookup.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.get_hits + self.get_misses;
        if lookups == 0 {
            0.0
        } else {
            self.get_hits as f64 / lookups as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_handles_no_lookups() {
        assert_eq!(SoftCacheMetricsSnapshot::default().hit_rate(), 0.0);
        let snapshot = SoftCacheMetricsSnapshot {
            get_hits: 3,
            get_misses: 1,
            ..Default::default()
        };
        assert!((snapshot.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
