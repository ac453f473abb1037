//! Session store client.
//!
//! # Responsibilities
//! - Single read path: breaker "redis" → deadline → key-value GET → decode
//! - Classify outcomes: absent key, unreadable store, undecodable record
//! - Keep the JSON decode off the I/O dispatch threads
//!
//! # Design Decisions
//! - The gateway never writes; TTLs belong to the identity service
//! - Payload content is never logged; decode failures log key + length

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use crate::error::{GatewayError, RejectReason};
use crate::resilience::CircuitBreaker;
use crate::session::SessionRecord;

/// I/O failure talking to the key-value store.
#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Narrow key-value seam. Production uses Redis; tests plug in a map.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Cheap connectivity probe for the readiness endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Redis-backed implementation over a managed async connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    /// Connect to the session cache. Supports redis:// and rediss:// URLs.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|e| StoreError(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| StoreError(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl SessionBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| StoreError(e.to_string()))
    }
}

/// In-memory backend for tests and local development.
#[derive(Default, Clone)]
pub struct MemoryBackend {
    entries: Arc<dashmap::DashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Breaker-guarded, timeout-bounded session reader.
#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    breaker: CircuitBreaker,
    read_timeout: Duration,
}

impl SessionStore {
    pub fn new(
        backend: Arc<dyn SessionBackend>,
        breaker: CircuitBreaker,
        read_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            breaker,
            read_timeout,
        }
    }

    /// Look up the session for `(partner, session_id)`.
    ///
    /// Outcome mapping:
    /// - breaker open → SessionServiceUnavailable (no read attempted)
    /// - I/O error or deadline → SessionServiceUnavailable
    /// - absent key → SessionInvalid (session not found)
    /// - undecodable record → Internal
    pub async fn get(
        &self,
        partner: &str,
        session_id: &str,
    ) -> Result<SessionRecord, GatewayError> {
        self.breaker
            .try_acquire()
            .map_err(GatewayError::from_breaker)?;

        let key = SessionRecord::cache_key(partner, session_id);
        let started = Instant::now();

        let read = tokio::time::timeout(self.read_timeout, self.backend.get(&key)).await;
        let elapsed = started.elapsed();

        let payload = match read {
            Ok(Ok(payload)) => {
                self.breaker.record_success(elapsed);
                payload
            }
            Ok(Err(error)) => {
                self.breaker.record_failure(elapsed);
                tracing::warn!(error = %error, "Session store read failed");
                return Err(GatewayError::SessionServiceUnavailable);
            }
            Err(_) => {
                self.breaker.record_failure(elapsed);
                tracing::warn!(
                    timeout_ms = self.read_timeout.as_millis() as u64,
                    "Session store read timed out"
                );
                return Err(GatewayError::SessionServiceUnavailable);
            }
        };

        let Some(payload) = payload.filter(|p| !p.is_empty()) else {
            return Err(GatewayError::SessionInvalid(RejectReason::SessionNotFound));
        };

        // Decode on the blocking pool; records can be a few KB of JSON.
        let payload_len = payload.len();
        let decoded =
            tokio::task::spawn_blocking(move || serde_json::from_str::<SessionRecord>(&payload))
                .await
                .map_err(|e| GatewayError::Internal(format!("decode task failed: {}", e)))?;

        decoded.map_err(|error| {
            tracing::error!(
                key = %key,
                payload_len,
                error = %error,
                "Session record is not decodable"
            );
            GatewayError::Internal("session record decode failed".to_string())
        })
    }

    /// Readiness probe against the backend, with a short deadline.
    pub async fn ping(&self) -> Result<(), StoreError> {
        tokio::time::timeout(Duration::from_secs(2), self.backend.ping())
            .await
            .map_err(|_| StoreError("ping timed out".to_string()))?
    }
}
