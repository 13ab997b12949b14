//! Logical Clock Module
//!
//! Per-instance relative time source for expiration checks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

// == Clock Trait ==
/// Source of relative, monotonically non-decreasing time in nanoseconds.
///
/// Each cache owns its clock, so two caches in one process never share time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current relative time in nanoseconds.
    fn now_nanos(&self) -> u64;
}

// == Monotonic Clock ==
/// Wall-independent clock backed by `Instant`, measured from construction.
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

// == Manual Clock ==
/// Clock that only moves when told to. Used to drive expiration deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_nanos(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst)
    }
}
