//! softcache: a concurrent cache that pins recently used values and lets the
//! rest be reclaimed.
//!
//! The entry point is [`cache::SoftCache`], configured through
//! [`builder::SoftCacheBuilder`]. See `DESIGN.md` for the internal
//! architecture and its invariants.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod error;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod policy;
pub mod prelude;
pub mod store;
pub mod traits;
