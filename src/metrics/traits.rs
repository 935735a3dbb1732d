//! Consumption side of cache metrics.
//!
//! Recording is internal to the cache; these traits cover reading
//! ([`MetricsSnapshotProvider`], for benches and tests) and publishing
//! ([`MetricsExporter`], for production monitoring).

/// Produces a point-in-time snapshot of metrics.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Publishes a snapshot to a monitoring system.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
