//! Route lookup.

use std::time::Duration;

use axum::http::Uri;

use crate::config::{RouteConfig, ValidationConfig};
use crate::http::middleware::SessionValidator;
use crate::session::SessionStore;

/// One compiled route: the path predicate, the upstream target and,
/// for protected routes, the bound session validator.
pub struct Route {
    pub name: String,
    pub path_prefix: String,
    pub upstream: Uri,
    pub timeout: Duration,
    pub validator: Option<SessionValidator>,
}

/// Compiled route table, longest prefix first.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile the configured routes, binding a validator to every
    /// protected one.
    pub fn from_config(
        configs: &[RouteConfig],
        validation: &ValidationConfig,
        store: &SessionStore,
        default_timeout: Duration,
    ) -> Self {
        let mut routes: Vec<Route> = configs
            .iter()
            .filter_map(|config| {
                let upstream: Uri = match config.upstream.parse() {
                    Ok(uri) => uri,
                    Err(error) => {
                        tracing::warn!(
                            route = %config.name,
                            upstream = %config.upstream,
                            error = %error,
                            "Skipping route with invalid upstream URI"
                        );
                        return None;
                    }
                };

                let validator = config.protected.then(|| {
                    SessionValidator::new(
                        config.name.clone(),
                        config.required_permissions.clone(),
                        validation.partner_claim_check,
                        store.clone(),
                    )
                });

                Some(Route {
                    name: config.name.clone(),
                    path_prefix: config.path_prefix.clone(),
                    upstream,
                    timeout: config
                        .timeout_secs
                        .map(Duration::from_secs)
                        .unwrap_or(default_timeout),
                    validator,
                })
            })
            .collect();

        // Longest prefix first, so `/api/simulation/admin` beats
        // `/api/simulation`.
        routes.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));

        Self { routes }
    }

    /// Find the route for a request path, if any.
    pub fn match_path(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|route| {
            path.strip_prefix(route.path_prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
                || route.path_prefix == "/"
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }
}
