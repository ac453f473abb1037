//! Session subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization header
//!     → token.rs (unsigned pre-parse, selects the session id)
//!     → store.rs (breaker-guarded key-value read, JSON decode)
//!     → model.rs (SessionRecord, derivations, envelope mapping)
//!     → token.rs (authoritative HMAC verify with the record's secret)
//! ```
//!
//! # Design Decisions
//! - The gateway is strictly a session consumer; records are created
//!   and expired by the external identity service
//! - Per-session HMAC keys: the pre-parse only selects the key, the
//!   second pass is the trust decision
//! - The key-value dependency sits behind a narrow trait so tests can
//!   substitute an in-memory map

pub mod model;
pub mod store;
pub mod token;

pub use model::{Fund, Relationship, SessionRecord, SessionSecret, UserInfo};
pub use store::{MemoryBackend, RedisBackend, SessionBackend, SessionStore, StoreError};
pub use token::TokenClaims;
