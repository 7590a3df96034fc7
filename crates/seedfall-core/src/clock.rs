//! Monotonic game clock.
//!
//! Spawn times, the game-over dwell rule and the drop cooldown all read
//! milliseconds from a [`Clock`]. Production code uses [`SystemClock`];
//! tests drive a [`ManualClock`] by hand.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonic millisecond source.
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed since the clock's epoch. Never decreases.
    fn now_ms(&self) -> u64;
}

/// Clock backed by [`Instant`], with its epoch at construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    /// Create a clock whose epoch is now.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Hand-driven clock. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `ms`.
    pub fn advance(&self, ms: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |now| {
                Some(now.saturating_add(ms))
            });
    }

    /// Jump to `ms` if it lies in the future; earlier readings are ignored.
    pub fn set(&self, ms: u64) {
        self.now.fetch_max(ms, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_is_shared_and_monotonic() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(150);
        assert_eq!(other.now_ms(), 150);
        clock.set(100);
        assert_eq!(clock.now_ms(), 150);
        clock.set(400);
        assert_eq!(other.now_ms(), 400);
    }

    #[test]
    fn system_clock_starts_near_zero() {
        let clock = SystemClock::new();
        assert!(clock.now_ms() < 1_000);
    }
}
