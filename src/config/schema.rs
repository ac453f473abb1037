//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! gateway. All types derive Serde traits for deserialization from
//! config files; every section has defaults so minimal configs work.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observability::NormalizationStrategy;
use crate::resilience::BreakerPolicy;

/// Root configuration for the session gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Session store (shared key-value cache) settings.
    pub session_store: SessionStoreConfig,

    /// Route definitions mapping path prefixes to upstreams.
    pub routes: Vec<RouteConfig>,

    /// Named circuit-breaker policies.
    pub breakers: BreakerSettings,

    /// Upstream dispatch settings (pooling, default deadline).
    pub upstream: UpstreamConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Session validation options.
    pub validation: ValidationConfig,

    /// Worker-pool sizing.
    pub runtime: RuntimeConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request deadline in seconds, validation included.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Session store connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionStoreConfig {
    /// Store URL (redis:// or rediss://).
    pub url: String,

    /// Optional password; can also come from
    /// `GATEWAY_SESSION_STORE_PASSWORD`.
    pub password: Option<String>,

    /// Per-read deadline in milliseconds.
    pub read_timeout_ms: u64,
}

impl SessionStoreConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Connection URL with the password (if any) spliced in.
    pub fn connection_url(&self) -> String {
        match &self.password {
            Some(password) if !password.is_empty() => self
                .url
                .replacen("://", &format!("://:{}@", password), 1),
            _ => self.url.clone(),
        }
    }
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            password: None,
            read_timeout_ms: 3_000,
        }
    }
}

/// Route configuration mapping a path prefix to an upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix to match (whole segments).
    pub path_prefix: String,

    /// Upstream URI (e.g., "http://simulation.internal:8081").
    pub upstream: String,

    /// Whether the session validation filter is bound to this route.
    #[serde(default = "default_protected")]
    pub protected: bool,

    /// Permissions the session must contain. Empty means
    /// "authenticated but unrestricted".
    #[serde(default)]
    pub required_permissions: Vec<String>,

    /// Per-route upstream deadline; falls back to the global default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_protected() -> bool {
    true
}

/// One named breaker policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerPolicyConfig {
    /// Failure-rate threshold in percent.
    pub failure_rate_pct: f32,
    /// Open-state wait before probing, in seconds.
    pub open_wait_secs: u64,
    /// Count-based sliding window size.
    pub window: usize,
    /// Minimum calls before rates are evaluated.
    pub min_calls: usize,
    /// Probe calls permitted in half-open.
    pub half_open_probes: usize,
    /// Slow-call-rate threshold in percent.
    pub slow_rate_pct: f32,
    /// Slow-call threshold in milliseconds.
    pub slow_threshold_ms: u64,
}

impl BreakerPolicyConfig {
    pub fn to_policy(&self) -> BreakerPolicy {
        BreakerPolicy {
            failure_rate_pct: self.failure_rate_pct,
            open_wait: Duration::from_secs(self.open_wait_secs),
            window: self.window,
            min_calls: self.min_calls,
            half_open_probes: self.half_open_probes,
            slow_rate_pct: self.slow_rate_pct,
            slow_threshold: Duration::from_millis(self.slow_threshold_ms),
        }
    }
}

impl Default for BreakerPolicyConfig {
    fn default() -> Self {
        Self {
            failure_rate_pct: 50.0,
            open_wait_secs: 30,
            window: 10,
            min_calls: 5,
            half_open_probes: 3,
            slow_rate_pct: 50.0,
            slow_threshold_ms: 2_000,
        }
    }
}

/// The named policies registered at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerSettings {
    pub default: BreakerPolicyConfig,
    pub redis: BreakerPolicyConfig,
    pub downstream: BreakerPolicyConfig,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            default: BreakerPolicyConfig::default(),
            redis: BreakerPolicyConfig {
                failure_rate_pct: 70.0,
                open_wait_secs: 15,
                window: 20,
                min_calls: 10,
                half_open_probes: 5,
                slow_rate_pct: 60.0,
                slow_threshold_ms: 1_000,
            },
            downstream: BreakerPolicyConfig {
                failure_rate_pct: 60.0,
                open_wait_secs: 45,
                window: 15,
                min_calls: 8,
                half_open_probes: 4,
                slow_rate_pct: 70.0,
                slow_threshold_ms: 5_000,
            },
        }
    }
}

/// Upstream dispatch settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Default per-request deadline in seconds.
    pub default_timeout_secs: u64,

    /// Connection pool: max idle connections per upstream host.
    pub pool_max_idle_per_host: usize,

    /// Connection pool: idle timeout in seconds.
    pub pool_idle_timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            pool_max_idle_per_host: 32,
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Common `application` tag on every exported series.
    pub service_name: String,

    /// Path-label normalization flavor; fixed per deployment.
    pub path_normalization: NormalizationStrategy,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
            service_name: "session-gateway".to_string(),
            path_normalization: NormalizationStrategy::Operation,
        }
    }
}

/// Session validation options.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// When true, a partner claim inside the token must agree with
    /// the partner header (defensive mode).
    pub partner_claim_check: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            partner_claim_check: true,
        }
    }
}

/// Worker-pool sizing.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Async worker threads; defaults to the CPU count.
    pub worker_threads: Option<usize>,

    /// Cap on the blocking pool used for JSON decode and HMAC
    /// verification; defaults to `cpus * 4`.
    pub max_blocking_threads: Option<usize>,
}

impl RuntimeConfig {
    pub fn blocking_pool_cap(&self) -> usize {
        self.max_blocking_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get() * 4)
                .unwrap_or(16)
        })
    }
}
