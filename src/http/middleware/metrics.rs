//! Per-request metrics filter.
//!
//! Runs inside the correlation filter and outside everything else, so
//! the status it observes is the final one — including rejections
//! rendered by the error mapper.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ErrorKind;
use crate::observability::{metrics, PathNormalizer};

/// Global filter, lowest precedence.
pub async fn track(
    State(normalizer): State<Arc<PathNormalizer>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = normalizer.normalize(request.uri().path());

    let response = next.run(request).await;

    metrics::record_request(
        &path,
        &method,
        response.status().as_u16(),
        started.elapsed(),
    );

    if let Some(kind) = response.extensions().get::<ErrorKind>() {
        metrics::record_error(&path, &method, kind.0);
    }

    response
}
