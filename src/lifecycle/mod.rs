//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Init metrics → Connect session store
//!     → Build pipeline → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → broadcast → stop accepting → drain → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)

pub mod shutdown;

pub use shutdown::Shutdown;
