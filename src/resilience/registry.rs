//! Process-wide registry of named circuit breakers.

use dashmap::DashMap;

use crate::config::BreakerSettings;
use crate::resilience::{BreakerPolicy, CircuitBreaker};

/// Named breakers, registered once at startup.
///
/// `breaker(name)` hands out a clone of the named breaker, falling
/// back to the shared `default` breaker for unknown names. Clones
/// share state, so every caller of `breaker("redis")` observes the
/// same window.
pub struct BreakerRegistry {
    breakers: DashMap<String, CircuitBreaker>,
    default: CircuitBreaker,
}

impl BreakerRegistry {
    /// Register the three named policies from configuration.
    pub fn from_config(settings: &BreakerSettings) -> Self {
        let registry = Self {
            breakers: DashMap::new(),
            default: CircuitBreaker::new("default", settings.default.to_policy()),
        };
        registry.register("redis", settings.redis.to_policy());
        registry.register("downstream", settings.downstream.to_policy());
        registry
    }

    fn register(&self, name: &str, policy: BreakerPolicy) {
        self.breakers
            .insert(name.to_string(), CircuitBreaker::new(name, policy));
    }

    /// Look up a breaker by name; unknown names get the default breaker.
    pub fn breaker(&self, name: &str) -> CircuitBreaker {
        self.breakers
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.default.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerSettings;

    #[test]
    fn test_named_breakers_are_shared() {
        let registry = BreakerRegistry::from_config(&BreakerSettings::default());

        let a = registry.breaker("redis");
        let b = registry.breaker("redis");
        a.record_failure(std::time::Duration::from_millis(1));

        // Both handles observe the same window state.
        assert_eq!(a.state(), b.state());
        assert_eq!(a.name(), "redis");
    }

    #[test]
    fn test_unknown_name_falls_back_to_default() {
        let registry = BreakerRegistry::from_config(&BreakerSettings::default());
        assert_eq!(registry.breaker("kafka").name(), "default");
    }
}
