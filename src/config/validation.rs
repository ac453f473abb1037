//! Configuration validation logic.

use std::collections::HashSet;

use axum::http::Uri;

use crate::config::schema::{BreakerPolicyConfig, GatewayConfig};

/// Error type for configuration validation failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError(pub String);

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation error: {}", self.0)
    }
}

/// Validate a GatewayConfig for semantic correctness.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // 1. Routes: unique names, well-formed prefixes, resolvable upstreams
    let mut names: HashSet<&str> = HashSet::new();
    for route in &config.routes {
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError(format!(
                "Duplicate route name '{}'",
                route.name
            )));
        }
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError(format!(
                "Route '{}' path_prefix must start with '/'",
                route.name
            )));
        }
        match route.upstream.parse::<Uri>() {
            Ok(uri) if uri.authority().is_some() => {}
            _ => errors.push(ValidationError(format!(
                "Route '{}' has an invalid upstream URI '{}'",
                route.name, route.upstream
            ))),
        }
        if let Some(0) = route.timeout_secs {
            errors.push(ValidationError(format!(
                "Route '{}' timeout_secs must be > 0",
                route.name
            )));
        }
    }

    // 2. Breaker policies
    for (name, policy) in [
        ("default", &config.breakers.default),
        ("redis", &config.breakers.redis),
        ("downstream", &config.breakers.downstream),
    ] {
        validate_policy(name, policy, &mut errors);
    }

    // 3. Session store
    if config.session_store.read_timeout_ms == 0 {
        errors.push(ValidationError(
            "session_store.read_timeout_ms must be > 0".to_string(),
        ));
    }

    if config.routes.is_empty() {
        tracing::warn!("No routes configured; every request will be a 404");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_policy(name: &str, policy: &BreakerPolicyConfig, errors: &mut Vec<ValidationError>) {
    for (field, value) in [
        ("failure_rate_pct", policy.failure_rate_pct),
        ("slow_rate_pct", policy.slow_rate_pct),
    ] {
        if !(value > 0.0 && value <= 100.0) {
            errors.push(ValidationError(format!(
                "breakers.{}.{} must be in (0, 100]",
                name, field
            )));
        }
    }
    if policy.window == 0 || policy.min_calls == 0 || policy.half_open_probes == 0 {
        errors.push(ValidationError(format!(
            "breakers.{}: window, min_calls and half_open_probes must be > 0",
            name
        )));
    }
    if policy.min_calls > policy.window {
        errors.push(ValidationError(format!(
            "breakers.{}: min_calls must not exceed window",
            name
        )));
    }
}
