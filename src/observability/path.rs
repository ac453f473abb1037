//! Path normalization for metric labels.
//!
//! # Responsibilities
//! - Collapse request paths into a finite label set
//! - Preserve the recognized operation suffixes under `/api/{service}`
//! - Fold everything unrecognized into `other`
//!
//! # Design Decisions
//! - Pure function over the path string; no regex, O(n) per path
//! - Known services come from the route table at startup
//! - The allowed outputs are enumerable: per service, the operation
//!   names, `*`-collapsed ids, `/api/{service}/other` and the bare
//!   prefix; plus `/actuator` and `other`

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Operation suffixes that survive normalization.
const OPERATIONS: [&str; 6] = [
    "validate",
    "form",
    "results",
    "approve",
    "documents",
    "settings",
];

/// Deepest normalized path kept under a service before folding to
/// `other`; bounds label cardinality even for adversarial paths.
const MAX_SERVICE_DEPTH: usize = 3;

/// Normalization flavor, fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationStrategy {
    /// Collapse numeric segments to `*`, keep recognized operations.
    #[default]
    Operation,
    /// Collapse everything under a service to `/api/{service}`.
    Prefix,
}

/// Path → label normalizer built once at startup.
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    strategy: NormalizationStrategy,
    services: HashSet<String>,
}

impl PathNormalizer {
    pub fn new(
        strategy: NormalizationStrategy,
        services: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            strategy,
            services: services.into_iter().collect(),
        }
    }

    /// Derive the known-service set from route path prefixes
    /// (`/api/simulation` contributes `simulation`).
    pub fn from_route_prefixes<'a>(
        strategy: NormalizationStrategy,
        prefixes: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let services = prefixes
            .into_iter()
            .filter_map(|prefix| {
                prefix
                    .strip_prefix("/api/")
                    .map(|rest| rest.split('/').next().unwrap_or(rest).to_string())
            })
            .filter(|s| !s.is_empty())
            .collect();
        Self { strategy, services }
    }

    /// Map a request path to its bounded metric label.
    pub fn normalize(&self, path: &str) -> String {
        if path == "/actuator" || path.starts_with("/actuator/") {
            return "/actuator".to_string();
        }

        let Some(rest) = path.strip_prefix("/api/") else {
            return "other".to_string();
        };

        let mut segments = rest.split('/').filter(|s| !s.is_empty());
        let Some(service) = segments.next() else {
            return "other".to_string();
        };
        if !self.services.contains(service) {
            return "other".to_string();
        }

        if self.strategy == NormalizationStrategy::Prefix {
            return format!("/api/{}", service);
        }

        let mut normalized = Vec::new();
        for segment in segments {
            if normalized.len() == MAX_SERVICE_DEPTH {
                return format!("/api/{}/other", service);
            }
            if segment.chars().all(|c| c.is_ascii_digit()) {
                normalized.push("*");
            } else if OPERATIONS.contains(&segment) {
                normalized.push(segment);
            } else {
                return format!("/api/{}/other", service);
            }
        }

        if normalized.is_empty() {
            format!("/api/{}", service)
        } else {
            format!("/api/{}/{}", service, normalized.join("/"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer(strategy: NormalizationStrategy) -> PathNormalizer {
        PathNormalizer::new(
            strategy,
            ["simulation".to_string(), "contracts".to_string()],
        )
    }

    #[test]
    fn test_operation_strategy() {
        let n = normalizer(NormalizationStrategy::Operation);

        assert_eq!(n.normalize("/api/simulation/42/validate"), "/api/simulation/*/validate");
        assert_eq!(n.normalize("/api/simulation/42"), "/api/simulation/*");
        assert_eq!(n.normalize("/api/simulation"), "/api/simulation");
        assert_eq!(n.normalize("/api/contracts/7/documents"), "/api/contracts/*/documents");
        // Unknown subpath under a known service.
        assert_eq!(n.normalize("/api/simulation/42/frobnicate"), "/api/simulation/other");
    }

    #[test]
    fn test_prefix_strategy() {
        let n = normalizer(NormalizationStrategy::Prefix);

        assert_eq!(n.normalize("/api/simulation/42/validate"), "/api/simulation");
        assert_eq!(n.normalize("/api/contracts"), "/api/contracts");
    }

    #[test]
    fn test_unknown_and_actuator_paths() {
        let n = normalizer(NormalizationStrategy::Operation);

        assert_eq!(n.normalize("/api/payments/1"), "other");
        assert_eq!(n.normalize("/totally/else"), "other");
        assert_eq!(n.normalize("/"), "other");
        assert_eq!(n.normalize("/actuator/health/liveness"), "/actuator");
        assert_eq!(n.normalize("/actuator"), "/actuator");
    }

    #[test]
    fn test_cardinality_is_bounded() {
        let n = normalizer(NormalizationStrategy::Operation);

        let mut labels = HashSet::new();
        // A flood of distinct paths must land in a small label set.
        for id in 0..1000 {
            labels.insert(n.normalize(&format!("/api/simulation/{}/validate", id)));
            labels.insert(n.normalize(&format!("/api/simulation/{}/x{}", id, id)));
            labels.insert(n.normalize(&format!("/api/unknown{}/y", id)));
            labels.insert(n.normalize(&format!("/api/simulation/{}/1/2/3/4/5", id)));
        }
        assert!(labels.len() <= 4, "labels: {:?}", labels);
    }

    #[test]
    fn test_services_derived_from_routes() {
        let n = PathNormalizer::from_route_prefixes(
            NormalizationStrategy::Operation,
            ["/api/simulation", "/api/contracts/v2", "/health"],
        );

        assert_eq!(n.normalize("/api/simulation/1"), "/api/simulation/*");
        assert_eq!(n.normalize("/api/contracts/1"), "/api/contracts/*");
        assert_eq!(n.normalize("/health"), "other");
    }
}
