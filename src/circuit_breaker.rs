//! # Circuit Breaker Module
//!
//! Stops calling the image host after repeated failures so a dead upstream
//! fails fast instead of stalling every image step.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for image host calls
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold exceeded, requests fail fast
/// - **Half-Open**: Reset timeout elapsed, the next request is let through
///
/// Uses `RecoveryConfig::circuit_breaker_threshold` and
/// `RecoveryConfig::circuit_breaker_reset_secs`.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    threshold: u32,
    reset_after: Duration,
}

impl CircuitBreaker {
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            threshold: config.circuit_breaker_threshold.max(1),
            reset_after: Duration::from_secs(config.circuit_breaker_reset_secs),
        }
    }

    /// Check if circuit breaker is open (blocking requests)
    pub fn is_open(&self) -> bool {
        self.is_open_at(Instant::now())
    }

    pub fn is_open_at(&self, now: Instant) -> bool {
        let mut state = self.lock();
        if state.failure_count < self.threshold {
            return false;
        }
        match state.last_failure_time {
            Some(last) if now.saturating_duration_since(last) < self.reset_after => true,
            _ => {
                // Half-open: allow one attempt, a new failure reopens immediately
                state.failure_count = self.threshold - 1;
                state.last_failure_time = None;
                false
            }
        }
    }

    /// Record a failure to increment the failure counter
    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now());
    }

    pub fn record_failure_at(&self, now: Instant) {
        let mut state = self.lock();
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_time = Some(now);
    }

    /// Record a success to reset the failure counter
    pub fn record_success(&self) {
        let mut state = self.lock();
        state.failure_count = 0;
        state.last_failure_time = None;
    }

    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(&RecoveryConfig {
            circuit_breaker_threshold: threshold,
            circuit_breaker_reset_secs: 60,
            ..Default::default()
        })
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = breaker(2);
        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(!breaker.is_open());

        breaker.record_failure();
        assert!(breaker.is_open());
    }

    #[test]
    fn test_success_closes() {
        let breaker = breaker(1);
        breaker.record_failure();
        assert!(breaker.is_open());

        breaker.record_success();
        assert!(!breaker.is_open());
        assert_eq!(breaker.failure_count(), 0);
    }

    #[test]
    fn test_half_open_after_reset_timeout() {
        let breaker = breaker(2);
        let start = Instant::now();
        breaker.record_failure_at(start);
        breaker.record_failure_at(start);
        assert!(breaker.is_open_at(start + Duration::from_secs(10)));

        // Reset elapsed: one attempt goes through
        assert!(!breaker.is_open_at(start + Duration::from_secs(61)));

        // And a single new failure opens it again
        breaker.record_failure_at(start + Duration::from_secs(62));
        assert!(breaker.is_open_at(start + Duration::from_secs(63)));
    }
}
