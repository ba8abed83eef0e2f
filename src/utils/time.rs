// src/utils/time.rs
//! Clocks for measuring per-window processing latency

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of elapsed time, injected so latency accounting can be tested
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> u64;

    fn now_micros(&self) -> u64 {
        self.now_nanos() / 1000
    }
}

/// Monotonic clock, nanoseconds since construction
pub struct MonotonicTimeProvider {
    origin: Instant,
}

impl MonotonicTimeProvider {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Manually driven clock for deterministic latency tests
pub struct MockTimeProvider {
    nanos: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(start_nanos: u64) -> Self {
        Self {
            nanos: AtomicU64::new(start_nanos),
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.nanos.fetch_add(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.nanos.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock_advances_only_when_told() {
        let clock = MockTimeProvider::new(1_000);
        assert_eq!(clock.now_nanos(), 1_000);
        assert_eq!(clock.now_nanos(), 1_000);

        clock.advance_by(2_500);
        assert_eq!(clock.now_micros(), 3);
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let clock = MonotonicTimeProvider::new();
        let a = clock.now_nanos();
        let b = clock.now_nanos();
        assert!(b >= a);
    }
}
