//! Routing subsystem.
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest path-prefix wins; no regex, O(n) over the route count
//! - Explicit no-match rather than a silent default route
//! - Each protected route owns its validator, built at registration
//!   time from the route's permission list

pub mod router;

pub use router::{Route, RouteTable};
