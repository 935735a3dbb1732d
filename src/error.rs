//! Error types for the softcache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. zero pin capacity, zero shards).
//! - [`CacheError`]: Returned when an operation receives an absent argument at
//!   the `try_*` boundary. The cache is never mutated when this is returned.
//! - [`CleanupError`]: Returned by a [`ValueCleaner`](crate::traits::ValueCleaner)
//!   that failed to release a value. The cache logs it and carries on.
//! - [`InvariantError`]: Returned when internal data-structure invariants are
//!   violated (see [`SoftCache::check_invariants`](crate::cache::SoftCache::check_invariants)).
//!
//! ## Example Usage
//!
//! ```
//! use softcache::builder::SoftCacheBuilder;
//! use softcache::error::ConfigError;
//!
//! // Fallible construction for user-configurable parameters
//! let cache = SoftCacheBuilder::<u64, String>::new().pin_capacity(8).try_build();
//! assert!(cache.is_ok());
//!
//! // A zero pin capacity is caught without panicking
//! let bad: Result<_, ConfigError> = SoftCacheBuilder::<u64, String>::new().pin_capacity(0).try_build();
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`SoftCacheBuilder::try_build`](crate::builder::SoftCacheBuilder::try_build)
/// and [`SoftLimit::try_new`](crate::policy::reclaim::SoftLimit::try_new).
///
/// # Example
///
/// ```
/// use softcache::builder::SoftCacheBuilder;
///
/// let err = SoftCacheBuilder::<u64, u64>::new()
///     .pin_capacity(0)
///     .try_build()
///     .unwrap_err();
/// assert!(err.to_string().contains("pin capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error returned by cache operations that reject their input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// A required argument was absent. `argument` names the parameter.
    NullArgument { argument: &'static str },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::NullArgument { argument } => {
                write!(f, "argument \"{}\" must not be absent", argument)
            },
        }
    }
}

impl std::error::Error for CacheError {}

// ---------------------------------------------------------------------------
// CleanupError
// ---------------------------------------------------------------------------

/// Failure reported by a value cleaner.
///
/// Cleaner failures never reach the caller of a cache operation; they are
/// logged at error level and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupError(String);

impl CleanupError {
    /// Creates a new `CleanupError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CleanupError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
