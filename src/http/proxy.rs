//! Upstream dispatch.
//!
//! # Responsibilities
//! - Rewrite the request URI to the route's upstream authority
//! - Guard the call with the `downstream` breaker and the per-route
//!   deadline
//! - Stream the upstream response back unchanged
//!
//! # Design Decisions
//! - 5xx responses count as breaker failures; 4xx are client errors
//!   and do not trip the breaker
//! - Connect errors and deadline overruns surface as 503, never as
//!   a hung request

use std::str::FromStr;
use std::time::Instant;

use axum::{
    body::Body,
    http::{
        uri::{Authority, Parts, PathAndQuery, Scheme},
        Request, Response, Uri,
    },
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::UpstreamConfig;
use crate::error::GatewayError;
use crate::http::middleware::session::ValidationStart;
use crate::resilience::CircuitBreaker;
use crate::routing::Route;

/// Pooled HTTP client for all upstreams, guarded by the `downstream`
/// breaker.
#[derive(Clone)]
pub struct UpstreamClient {
    client: Client<HttpConnector, Body>,
    breaker: CircuitBreaker,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, breaker: CircuitBreaker) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(std::time::Duration::from_secs(config.pool_idle_timeout_secs))
            .build(HttpConnector::new());

        Self { client, breaker }
    }

    /// Forward a validated request to the route's upstream and stream
    /// the response back.
    pub async fn forward(
        &self,
        route: &Route,
        mut request: Request<Body>,
    ) -> Result<Response<Body>, GatewayError> {
        self.breaker
            .try_acquire()
            .map_err(GatewayError::from_breaker)?;

        *request.uri_mut() = rewrite_uri(request.uri(), &route.upstream)?;

        if let Some(ValidationStart(validated_at)) = request.extensions().get::<ValidationStart>()
        {
            tracing::debug!(
                route = %route.name,
                upstream = %route.upstream,
                pipeline_ms = validated_at.elapsed().as_millis() as u64,
                "Dispatching to upstream"
            );
        }

        let started = Instant::now();
        let result = tokio::time::timeout(route.timeout, self.client.request(request)).await;
        let elapsed = started.elapsed();

        match result {
            Ok(Ok(response)) => {
                if response.status().is_server_error() {
                    self.breaker.record_failure(elapsed);
                } else {
                    self.breaker.record_success(elapsed);
                }

                // Stream the body through unchanged.
                let (parts, body) = response.into_parts();
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            Ok(Err(error)) => {
                self.breaker.record_failure(elapsed);
                tracing::warn!(
                    route = %route.name,
                    upstream = %route.upstream,
                    error = %error,
                    "Upstream request failed"
                );
                Err(GatewayError::DownstreamUnavailable)
            }
            Err(_) => {
                self.breaker.record_failure(elapsed);
                tracing::warn!(
                    route = %route.name,
                    upstream = %route.upstream,
                    timeout_ms = route.timeout.as_millis() as u64,
                    "Upstream request timed out"
                );
                Err(GatewayError::DownstreamUnavailable)
            }
        }
    }
}

/// Swap scheme and authority for the upstream's, keeping path and query.
fn rewrite_uri(original: &Uri, upstream: &Uri) -> Result<Uri, GatewayError> {
    let mut parts = Parts::default();

    parts.scheme = Some(
        upstream
            .scheme()
            .cloned()
            .unwrap_or(Scheme::HTTP),
    );

    let authority = upstream
        .authority()
        .map(|a| a.as_str())
        .ok_or_else(|| GatewayError::Internal("upstream URI has no authority".to_string()))?;
    parts.authority = Some(
        Authority::from_str(authority)
            .map_err(|e| GatewayError::Internal(format!("invalid upstream authority: {}", e)))?,
    );

    parts.path_and_query = Some(
        original
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/")),
    );

    Uri::from_parts(parts).map_err(|e| GatewayError::Internal(format!("URI rewrite failed: {}", e)))
}
