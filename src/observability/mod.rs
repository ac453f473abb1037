//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Every request:
//!     → path.rs (normalize the path into a bounded label set)
//!     → metrics.rs (duration histogram, request/error counters)
//!
//! Consumers:
//!     → Prometheus scrape on the dedicated metrics listener
//!     → Structured logs (tracing) carrying the correlation id
//! ```
//!
//! # Design Decisions
//! - Label cardinality is an invariant, not an emergent behavior:
//!   label values come from a finite normalization set
//! - Metrics are cheap (atomic increments); normalization is a pure
//!   function over the path string
//! - The normalization strategy is fixed for the process lifetime

pub mod metrics;
pub mod path;

pub use path::{NormalizationStrategy, PathNormalizer};
