//! Cache metrics.
//!
//! Compiled only with the `metrics` feature. The cache records into
//! [`counters::SoftCacheCounters`] with relaxed atomics on its hot paths;
//! readers take a [`snapshot::SoftCacheMetricsSnapshot`] and may hand it to
//! any [`traits::MetricsExporter`].

pub mod counters;
pub mod exporter;
pub mod snapshot;
pub mod traits;
