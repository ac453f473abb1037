//! Request pipeline filters.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → correlation.rs (outermost: take/mint the correlation id)
//!     → metrics.rs (observes the final status of everything inside)
//!     → route match
//!     → session.rs (route-scoped validator, rewrites the request)
//!     → upstream dispatch
//! ```
//!
//! # Design Decisions
//! - Correlation runs first so every response carries the id,
//!   including rejections minted deep inside the pipeline
//! - When session validation short-circuits, only the metrics filter
//!   and the error mapper see the request on the way out

pub mod correlation;
pub mod metrics;
pub mod session;

pub use correlation::CorrelationId;
pub use session::SessionValidator;
