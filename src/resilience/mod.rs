//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a dependency (session store, upstream):
//!     → registry.rs (look up the named breaker, or the default)
//!     → circuit_breaker.rs try_acquire (fail fast when open)
//!     → dependency call with its own deadline
//!     → record outcome (success/failure + elapsed, for slow-call rate)
//! ```
//!
//! # Design Decisions
//! - Named breakers with per-dependency policy; callers never share one
//! - Count-based sliding window over the last N call outcomes
//! - Rejections carry the policy name so the error mapper can tell
//!   a session-store outage from a downstream outage
//! - Breakers live for the process lifetime; no reconfiguration

pub mod circuit_breaker;
pub mod registry;

pub use circuit_breaker::{BreakerPolicy, BreakerRejected, BreakerState, CircuitBreaker};
pub use registry::BreakerRegistry;
