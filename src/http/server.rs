//! HTTP server setup and request pipeline host.
//!
//! # Responsibilities
//! - Create the Axum router and wire the global filter order
//!   (correlation outermost, metrics inside it, everything else after)
//! - Bind each protected route to its session validator
//! - Serve the actuator endpoints outside session validation
//! - Dispatch validated requests to the upstream client
//!
//! # Design Decisions
//! - One catch-all handler + longest-prefix route table, so route
//!   predicates live in configuration rather than in Axum's router
//! - When validation short-circuits, only the metrics filter and the
//!   error mapper touch the request on the way out

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::error::{self, GatewayError};
use crate::http::middleware::{self, CorrelationId};
use crate::http::proxy::UpstreamClient;
use crate::observability::PathNormalizer;
use crate::resilience::BreakerRegistry;
use crate::routing::RouteTable;
use crate::session::SessionStore;

/// Application state injected into the catch-all handler.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub upstream: UpstreamClient,
    pub store: SessionStore,
}

/// The gateway server: pipeline host plus listener glue.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Assemble the pipeline from configuration and a session store.
    ///
    /// The store is passed in (rather than built here) so tests can
    /// substitute an in-memory backend.
    pub fn new(config: &GatewayConfig, registry: &BreakerRegistry, store: SessionStore) -> Self {
        let routes = Arc::new(RouteTable::from_config(
            &config.routes,
            &config.validation,
            &store,
            config.upstream.default_timeout(),
        ));

        let normalizer = Arc::new(PathNormalizer::from_route_prefixes(
            config.observability.path_normalization,
            config.routes.iter().map(|r| r.path_prefix.as_str()),
        ));

        let upstream = UpstreamClient::new(&config.upstream, registry.breaker("downstream"));

        let state = AppState {
            routes,
            upstream,
            store,
        };

        let router = Router::new()
            .route("/actuator/health/liveness", get(liveness))
            .route("/actuator/health/readiness", get(readiness))
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(from_fn_with_state(normalizer, middleware::metrics::track))
            .layer(from_fn(middleware::correlation::propagate));

        Self { router }
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main pipeline handler: route match, validation, upstream dispatch.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let correlation_id = request
        .extensions()
        .get::<CorrelationId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let path = request.uri().path().to_string();

    let Some(route) = state.routes.match_path(&path) else {
        return error::render(
            &GatewayError::Gateway(StatusCode::NOT_FOUND),
            &correlation_id,
            None,
            &path,
        );
    };

    let request = match &route.validator {
        Some(validator) => match validator.validate(request).await {
            Ok(rewritten) => rewritten,
            Err(err) => {
                return error::render(&err, &correlation_id, Some(&route.name), &path)
            }
        },
        None => request,
    };

    match state.upstream.forward(route, request).await {
        Ok(response) => response,
        Err(err) => error::render(&err, &correlation_id, Some(&route.name), &path),
    }
}

/// Liveness: the process is up and serving.
async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

/// Readiness: the session backend answers within a short deadline.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(error) => {
            tracing::warn!(error = %error, "Readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}
