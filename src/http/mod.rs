//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (Axum setup, global filter order, actuator routes)
//!     → middleware/correlation.rs (take/mint X-Correlation-ID)
//!     → middleware/metrics.rs (final-status observation)
//!     → routing (longest-prefix match)
//!     → middleware/session.rs (protected routes only)
//!     → headers.rs (allow-list rewrite + envelope injection)
//!     → proxy.rs (upstream dispatch, response streamed back)
//! ```

pub mod headers;
pub mod middleware;
pub mod proxy;
pub mod server;

pub use proxy::UpstreamClient;
pub use server::GatewayServer;
