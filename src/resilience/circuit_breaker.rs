//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: normal operation, outcomes recorded in a sliding window
//! - Open: dependency assumed down, calls rejected immediately
//! - Half-Open: bounded number of probe calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure rate or slow-call rate over the window
//!                exceeds the threshold, after at least min_calls
//! Open → Half-Open: after the open-state wait
//! Half-Open → Closed: all probes succeed
//! Half-Open → Open: any probe fails
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::observability::metrics;

/// Thresholds and windows governing one named breaker.
#[derive(Debug, Clone)]
pub struct BreakerPolicy {
    /// Failure-rate threshold in percent (0..=100].
    pub failure_rate_pct: f32,
    /// How long the breaker stays open before probing.
    pub open_wait: Duration,
    /// Size of the count-based sliding window.
    pub window: usize,
    /// Minimum recorded calls before rates are evaluated.
    pub min_calls: usize,
    /// Number of probe calls permitted in half-open.
    pub half_open_probes: usize,
    /// Slow-call-rate threshold in percent (0..=100].
    pub slow_rate_pct: f32,
    /// Calls slower than this count as slow.
    pub slow_threshold: Duration,
}

/// Breaker state, exported as a gauge (0=Closed, 1=Open, 2=HalfOpen).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Rejection issued when a breaker refuses a call. Carries the policy
/// name so the caller can map it to the right external error.
#[derive(Debug, Clone)]
pub struct BreakerRejected {
    pub breaker: String,
}

impl BreakerRejected {
    pub fn new(breaker: impl Into<String>) -> Self {
        Self { breaker: breaker.into() }
    }
}

impl std::fmt::Display for BreakerRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "circuit breaker '{}' rejected the call", self.breaker)
    }
}

impl std::error::Error for BreakerRejected {}

#[derive(Debug, Clone, Copy)]
struct Outcome {
    failed: bool,
    slow: bool,
}

#[derive(Debug)]
enum Phase {
    Closed { window: VecDeque<Outcome> },
    Open { since: Instant },
    HalfOpen { issued: usize, succeeded: usize },
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
}

/// A single named circuit breaker. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    name: Arc<str>,
    policy: Arc<BreakerPolicy>,
    inner: Arc<Mutex<Inner>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, policy: BreakerPolicy) -> Self {
        let name: Arc<str> = name.into().into();
        Self {
            name,
            policy: Arc::new(policy),
            inner: Arc::new(Mutex::new(Inner {
                phase: Phase::Closed { window: VecDeque::new() },
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask permission to make a call. Rejected when open (and the wait
    /// has not elapsed) or when half-open probes are exhausted.
    pub fn try_acquire(&self) -> Result<(), BreakerRejected> {
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");

        match &mut inner.phase {
            Phase::Closed { .. } => Ok(()),
            Phase::Open { since } => {
                if since.elapsed() >= self.policy.open_wait {
                    inner.phase = Phase::HalfOpen { issued: 1, succeeded: 0 };
                    self.log_transition(BreakerState::HalfOpen);
                    Ok(())
                } else {
                    Err(BreakerRejected::new(self.name.as_ref()))
                }
            }
            Phase::HalfOpen { issued, .. } => {
                if *issued < self.policy.half_open_probes {
                    *issued += 1;
                    Ok(())
                } else {
                    Err(BreakerRejected::new(self.name.as_ref()))
                }
            }
        }
    }

    /// Record a successful call with its duration.
    pub fn record_success(&self, elapsed: Duration) {
        let slow = elapsed >= self.policy.slow_threshold;
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");

        match &mut inner.phase {
            Phase::Closed { window } => {
                Self::push_outcome(window, self.policy.window, Outcome { failed: false, slow });
                if self.should_open(window) {
                    inner.phase = Phase::Open { since: Instant::now() };
                    self.log_transition(BreakerState::Open);
                }
            }
            Phase::HalfOpen { succeeded, .. } => {
                *succeeded += 1;
                if *succeeded >= self.policy.half_open_probes {
                    inner.phase = Phase::Closed { window: VecDeque::new() };
                    self.log_transition(BreakerState::Closed);
                }
            }
            Phase::Open { .. } => {}
        }
    }

    /// Record a failed call with its duration.
    pub fn record_failure(&self, elapsed: Duration) {
        let slow = elapsed >= self.policy.slow_threshold;
        let mut inner = self.inner.lock().expect("breaker mutex poisoned");

        match &mut inner.phase {
            Phase::Closed { window } => {
                Self::push_outcome(window, self.policy.window, Outcome { failed: true, slow });
                if self.should_open(window) {
                    inner.phase = Phase::Open { since: Instant::now() };
                    self.log_transition(BreakerState::Open);
                }
            }
            Phase::HalfOpen { .. } => {
                // Any probe failure reopens immediately.
                inner.phase = Phase::Open { since: Instant::now() };
                self.log_transition(BreakerState::Open);
            }
            Phase::Open { .. } => {}
        }
    }

    /// Current state, for metrics and tests.
    pub fn state(&self) -> BreakerState {
        let inner = self.inner.lock().expect("breaker mutex poisoned");
        match inner.phase {
            Phase::Closed { .. } => BreakerState::Closed,
            Phase::Open { .. } => BreakerState::Open,
            Phase::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    fn push_outcome(window: &mut VecDeque<Outcome>, capacity: usize, outcome: Outcome) {
        if window.len() == capacity {
            window.pop_front();
        }
        window.push_back(outcome);
    }

    fn should_open(&self, window: &VecDeque<Outcome>) -> bool {
        if window.len() < self.policy.min_calls {
            return false;
        }
        let total = window.len() as f32;
        let failures = window.iter().filter(|o| o.failed).count() as f32;
        let slow = window.iter().filter(|o| o.slow).count() as f32;

        failures * 100.0 / total >= self.policy.failure_rate_pct
            || slow * 100.0 / total >= self.policy.slow_rate_pct
    }

    fn log_transition(&self, to: BreakerState) {
        tracing::warn!(breaker = %self.name, state = ?to, "Circuit breaker state change");
        metrics::record_breaker_state(&self.name, to);
    }
}
