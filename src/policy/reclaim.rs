//! Reclamation strategies.
//!
//! Without a garbage collector nothing releases a value behind the cache's
//! back, so the decision "which unpinned values go now" is made by a
//! [`ReclaimStrategy`]. The cache consults it at the start of every
//! draining operation and releases up to the returned number of unpinned
//! entries. Pinned entries are never handed to the evictor, whatever the
//! budget.
//!
//! | Strategy      | Budget when idle                    | Budget under pressure |
//! |---------------|-------------------------------------|-----------------------|
//! | [`OnPressure`]| 0                                   | everything unpinned   |
//! | [`SoftLimit`] | entries above `max(limit, pins)`    | everything unpinned   |
//! | [`Manual`]    | 0                                   | 0                     |
//!
//! [`Manual`] leaves reclamation entirely to explicit calls such as
//! [`SoftCache::release_unpinned`](crate::cache::SoftCache::release_unpinned).
use std::fmt;

use crate::error::ConfigError;

/// Inputs to a reclamation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimState {
    /// Entries currently in the table.
    pub entries: usize,
    /// Configured pin capacity of the cache.
    pub pin_capacity: usize,
    /// `true` if the memory-pressure signal was raised since the last check.
    pub under_pressure: bool,
}

/// Decides how many unpinned entries to release.
pub trait ReclaimStrategy: Send + Sync + fmt::Debug {
    /// Maximum number of unpinned entries to release now.
    fn budget(&self, state: &ReclaimState) -> usize;
}

/// Releases every unpinned entry when memory pressure is signalled, and
/// nothing otherwise. The default strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OnPressure;

impl ReclaimStrategy for OnPressure {
    fn budget(&self, state: &ReclaimState) -> usize {
        if state.under_pressure { usize::MAX } else { 0 }
    }
}

/// Never releases anything on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manual;

impl ReclaimStrategy for Manual {
    fn budget(&self, _state: &ReclaimState) -> usize {
        0
    }
}

/// Keeps the table at or below a fixed number of entries by releasing
/// unpinned entries, and releases every unpinned entry under pressure.
///
/// The effective limit is never below the pin capacity, since pinned entries
/// cannot be released.
///
/// # Example
///
/// ```
/// use softcache::policy::reclaim::{ReclaimState, ReclaimStrategy, SoftLimit};
///
/// let limit = SoftLimit::new(100);
/// let state = ReclaimState { entries: 130, pin_capacity: 20, under_pressure: false };
/// assert_eq!(limit.budget(&state), 30);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftLimit {
    max_entries: usize,
}

impl SoftLimit {
    /// Creates a limit of `max_entries`.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is zero. See [`try_new`](Self::try_new).
    pub fn new(max_entries: usize) -> Self {
        match Self::try_new(max_entries) {
            Ok(limit) => limit,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a limit, returning an error on a zero limit.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `max_entries` is zero.
    pub fn try_new(max_entries: usize) -> Result<Self, ConfigError> {
        if max_entries == 0 {
            return Err(ConfigError::new("soft limit must be greater than zero"));
        }
        Ok(Self { max_entries })
    }

    /// Returns the configured limit.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}

impl ReclaimStrategy for SoftLimit {
    fn budget(&self, state: &ReclaimState) -> usize {
        if state.under_pressure {
            return usize::MAX;
        }
        state
            .entries
            .saturating_sub(self.max_entries.max(state.pin_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(entries: usize, under_pressure: bool) -> ReclaimState {
        ReclaimState {
            entries,
            pin_capacity: 20,
            under_pressure,
        }
    }

    #[test]
    fn on_pressure_only_reacts_to_pressure() {
        assert_eq!(OnPressure.budget(&state(1_000, false)), 0);
        assert_eq!(OnPressure.budget(&state(1_000, true)), usize::MAX);
    }

    #[test]
    fn manual_never_reclaims() {
        assert_eq!(Manual.budget(&state(1_000, false)), 0);
        assert_eq!(Manual.budget(&state(1_000, true)), 0);
    }

    #[test]
    fn soft_limit_budget_is_overflow() {
        let limit = SoftLimit::new(50);
        assert_eq!(limit.budget(&state(40, false)), 0);
        assert_eq!(limit.budget(&state(50, false)), 0);
        assert_eq!(limit.budget(&state(75, false)), 25);
        assert_eq!(limit.budget(&state(75, true)), usize::MAX);
    }

    #[test]
    fn soft_limit_never_below_pin_capacity() {
        let limit = SoftLimit::new(5);
        // pin capacity 20 dominates the limit of 5
        assert_eq!(limit.budget(&state(20, false)), 0);
        assert_eq!(limit.budget(&state(23, false)), 3);
    }

    #[test]
    fn soft_limit_rejects_zero() {
        let err = SoftLimit::try_new(0).unwrap_err();
        assert!(err.message().contains("soft limit"));
        assert_eq!(SoftLimit::try_new(3).map(|l| l.max_entries()), Ok(3));
    }

    #[test]
    #[should_panic(expected = "soft limit")]
    fn soft_limit_new_panics_on_zero() {
        let _ = SoftLimit::new(0);
    }

    #[test]
    fn strategies_are_object_safe() {
        let strategies: Vec<Box<dyn ReclaimStrategy>> =
            vec![Box::new(OnPressure), Box::new(Manual), Box::new(SoftLimit::new(1))];
        let total: usize = strategies
            .iter()
            .map(|s| s.budget(&state(0, false)))
            .sum();
        assert_eq!(total, 0);
    }
}
