// ============================================
// File: crates/gameshard-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Sessions record their last inbound activity on every frame while the
//! idle reaper reads it from another task. A lock-free timestamp keeps
//! that hot path cheap.
//!
//! ## Main Functionality
//! - `AtomicInstant`: `Instant` stored as milliseconds in an `AtomicU64`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Resolution is one millisecond, which is plenty for idle detection
//! - Instants earlier than the process-wide reference collapse to it
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

// ============================================
// AtomicInstant
// ============================================

/// Thread-safe, lock-free holder of an [`Instant`].
///
/// # Example
/// ```
/// use std::time::Duration;
/// use gameshard_common::time::AtomicInstant;
///
/// let last_seen = AtomicInstant::now();
/// last_seen.touch();
/// assert!(!last_seen.has_elapsed(Duration::from_secs(60)));
/// ```
#[derive(Debug)]
pub struct AtomicInstant {
    /// Milliseconds since [`reference`]
    millis: AtomicU64,
}

/// Process-wide reference point all stored values are relative to.
fn reference() -> Instant {
    static REFERENCE: OnceLock<Instant> = OnceLock::new();
    *REFERENCE.get_or_init(Instant::now)
}

fn to_millis(instant: Instant) -> u64 {
    instant
        .checked_duration_since(reference())
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl AtomicInstant {
    /// Creates a new `AtomicInstant` set to the current time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_instant(Instant::now())
    }

    /// Creates a new `AtomicInstant` holding `instant`.
    #[must_use]
    pub fn from_instant(instant: Instant) -> Self {
        Self {
            millis: AtomicU64::new(to_millis(instant)),
        }
    }

    /// Loads the stored instant.
    #[must_use]
    pub fn load(&self) -> Instant {
        reference() + Duration::from_millis(self.millis.load(Ordering::Relaxed))
    }

    /// Stores a new instant.
    pub fn store(&self, instant: Instant) {
        self.millis.store(to_millis(instant), Ordering::Relaxed);
    }

    /// Sets the stored instant to now.
    pub fn touch(&self) {
        self.store(Instant::now());
    }

    /// Time elapsed since the stored instant.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.load().elapsed()
    }

    /// Returns `true` if more than `duration` passed since the stored instant.
    #[must_use]
    pub fn has_elapsed(&self, duration: Duration) -> bool {
        self.elapsed() > duration
    }
}

impl Default for AtomicInstant {
    fn default() -> Self {
        Self::now()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load() {
        let atomic = AtomicInstant::now();
        let later = Instant::now() + Duration::from_secs(5);
        atomic.store(later);

        let loaded = atomic.load();
        let diff = if loaded > later { loaded - later } else { later - loaded };
        assert!(diff <= Duration::from_millis(1));
    }

    #[test]
    fn test_has_elapsed() {
        let past = Instant::now()
            .checked_sub(Duration::from_secs(10))
            .unwrap_or_else(Instant::now);
        let atomic = AtomicInstant::from_instant(past);
        assert!(!atomic.has_elapsed(Duration::from_secs(3600)));

        atomic.touch();
        assert!(!atomic.has_elapsed(Duration::from_secs(1)));
    }
}
