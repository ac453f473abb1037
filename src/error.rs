//! Gateway error taxonomy and response mapping.
//!
//! # Responsibilities
//! - Define the failure kinds the pipeline can produce
//! - Map each kind to a stable (status, code) pair
//! - Render the external JSON error body
//!
//! # Design Decisions
//! - One rendering point: every rejection response is built here
//! - Breaker-open failures keep the originating policy name so the
//!   session-store breaker maps differently from the downstream one
//! - 4xx rejections log at WARN, 5xx at ERROR; token contents and
//!   session secrets never appear in any log line

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::resilience::BreakerRejected;

/// Reason detail for a 401 rejection. Only used for logging; every
/// variant renders as the same external `INVALID_SESSION` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingAuthorization,
    MissingPartner,
    MalformedToken,
    SessionNotFound,
    SignatureInvalid,
    PartnerMismatch,
    NoRelationshipSelected,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::MissingAuthorization => "missing authorization header",
            RejectReason::MissingPartner => "missing partner header",
            RejectReason::MalformedToken => "malformed token",
            RejectReason::SessionNotFound => "session not found",
            RejectReason::SignatureInvalid => "token signature invalid",
            RejectReason::PartnerMismatch => "partner mismatch",
            RejectReason::NoRelationshipSelected => "no relationship selected",
        };
        f.write_str(s)
    }
}

/// Internal failure kinds produced by the request pipeline.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Authentication failed: bad header, bad token, missing session,
    /// partner disagreement or no selected relationship.
    #[error("invalid session: {0}")]
    SessionInvalid(RejectReason),

    /// The session store could not serve the lookup (breaker open,
    /// I/O failure or read timeout).
    #[error("session service unavailable")]
    SessionServiceUnavailable,

    /// The session is valid but lacks a required permission.
    #[error("insufficient permissions")]
    InsufficientPermissions,

    /// The downstream breaker is open, or the upstream call failed at
    /// the transport layer (connect error, timeout).
    #[error("downstream service unavailable")]
    DownstreamUnavailable,

    /// A breaker other than `redis`/`downstream` rejected the call.
    #[error("circuit breaker '{0}' is open")]
    CircuitOpen(String),

    /// A gateway-origin response with an upstream-style status
    /// (e.g. no route matched).
    #[error("gateway error: {0}")]
    Gateway(StatusCode),

    /// Anything else. The string is safe for logs (no payloads).
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// External HTTP status for this kind.
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::SessionInvalid(_) => StatusCode::UNAUTHORIZED,
            GatewayError::SessionServiceUnavailable => StatusCode::UNAUTHORIZED,
            GatewayError::InsufficientPermissions => StatusCode::FORBIDDEN,
            GatewayError::DownstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Gateway(status) => *status,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable taxonomy code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::SessionInvalid(_) => "INVALID_SESSION",
            GatewayError::SessionServiceUnavailable => "SESSION_SERVICE_UNAVAILABLE",
            GatewayError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            GatewayError::DownstreamUnavailable => "SERVICE_TEMPORARILY_UNAVAILABLE",
            GatewayError::CircuitOpen(_) => "CIRCUIT_BREAKER_OPEN",
            GatewayError::Gateway(_) => "GATEWAY_ERROR",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Bounded label for the errors counter.
    pub fn kind_label(&self) -> &'static str {
        match self {
            GatewayError::SessionInvalid(_) => "session_invalid",
            GatewayError::SessionServiceUnavailable => "session_service_unavailable",
            GatewayError::InsufficientPermissions => "insufficient_permissions",
            GatewayError::DownstreamUnavailable => "downstream_unavailable",
            GatewayError::CircuitOpen(_) => "circuit_open",
            GatewayError::Gateway(_) => "gateway",
            GatewayError::Internal(_) => "internal",
        }
    }

    /// Human message for the response body. Intentionally coarse: the
    /// detailed reason goes to the logs, not to the caller.
    pub fn message(&self) -> String {
        match self {
            GatewayError::SessionInvalid(_) => "Session is invalid or expired".to_string(),
            GatewayError::SessionServiceUnavailable => {
                "Session service is temporarily unavailable".to_string()
            }
            GatewayError::InsufficientPermissions => {
                "Insufficient permissions for this operation".to_string()
            }
            GatewayError::DownstreamUnavailable => {
                "Service is temporarily unavailable".to_string()
            }
            GatewayError::CircuitOpen(name) => {
                format!("Circuit breaker '{}' is open", name)
            }
            GatewayError::Gateway(status) => match *status {
                StatusCode::NOT_FOUND => "No route matched the request path".to_string(),
                other => format!("Gateway error ({})", other.as_u16()),
            },
            GatewayError::Internal(_) => "Internal error".to_string(),
        }
    }

    /// Map a breaker rejection to the error kind for its policy.
    pub fn from_breaker(rejected: BreakerRejected) -> Self {
        match rejected.breaker.as_str() {
            "redis" => GatewayError::SessionServiceUnavailable,
            "downstream" => GatewayError::DownstreamUnavailable,
            _ => GatewayError::CircuitOpen(rejected.breaker),
        }
    }
}

/// External error body. Field names are part of the wire contract.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub timestamp: String,
    pub status: u16,
    pub error: String,
    pub code: String,
    pub message: String,
    #[serde(rename = "correlationId")]
    pub correlation_id: String,
}

/// Bounded error-kind label, attached to rejection responses so the
/// metrics layer can count them without re-classifying.
#[derive(Debug, Clone, Copy)]
pub struct ErrorKind(pub &'static str);

/// Render an error as the external response.
///
/// Logs the rejection here (and only here) so every failure produces
/// exactly one log line: WARN for 4xx (reason, route, path,
/// correlation id), ERROR for 5xx.
pub fn render(
    err: &GatewayError,
    correlation_id: &str,
    route: Option<&str>,
    path: &str,
) -> Response<Body> {
    let status = err.status();

    if status.is_server_error() {
        tracing::error!(
            correlation_id = %correlation_id,
            route = route.unwrap_or("-"),
            path = %path,
            code = err.code(),
            error = %err,
            "Request failed"
        );
    } else {
        tracing::warn!(
            correlation_id = %correlation_id,
            route = route.unwrap_or("-"),
            path = %path,
            code = err.code(),
            reason = %err,
            "Request rejected"
        );
    }

    let body = ErrorBody {
        timestamp: Utc::now().to_rfc3339(),
        status: status.as_u16(),
        error: status.canonical_reason().unwrap_or("Unknown").to_string(),
        code: err.code().to_string(),
        message: err.message(),
        correlation_id: correlation_id.to_string(),
    };

    let json = serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec());

    let mut response = Response::new(Body::from(json));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response.extensions_mut().insert(ErrorKind(err.kind_label()));
    response
}
