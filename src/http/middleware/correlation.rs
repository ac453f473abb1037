//! Correlation-id propagation.
//!
//! # Responsibilities
//! - Take the inbound `X-Correlation-ID` or mint a fresh UUID
//! - Expose the id to the rest of the pipeline via request extensions
//! - Carry the id in the log context for every line of the request
//! - Stamp the id on every response, success or failure

use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::http::headers::X_CORRELATION_ID;

/// Request-scoped correlation id, readable from `Request::extensions()`.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

/// Global filter, highest precedence.
pub async fn propagate(mut request: Request<Body>, next: Next) -> Response {
    let id = request
        .headers()
        .get(&X_CORRELATION_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    // Normalize the request header so pre-rewrite readers see the
    // same value the upstream will.
    if let Ok(value) = HeaderValue::from_str(&id) {
        request.headers_mut().insert(X_CORRELATION_ID.clone(), value);
    }
    request.extensions_mut().insert(CorrelationId(id.clone()));

    // The span is the logging context; it is dropped on every exit
    // path, including cancellation.
    let span = tracing::info_span!(
        "request",
        correlation_id = %id,
        session_id = tracing::field::Empty,
        partner = tracing::field::Empty,
        route = tracing::field::Empty,
    );

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_CORRELATION_ID.clone(), value);
    }

    response
}
