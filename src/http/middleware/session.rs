//! Session validation filter.
//!
//! # Responsibilities
//! - Enforce the ordered validation pipeline on protected routes
//! - Rewrite the request to the trusted envelope on success
//! - Abort with a typed failure on the first violated check
//!
//! # Validation order
//! ```text
//! 1. stamp start time          6. verify token signature
//! 2. Authorization header      7. relationship selected
//! 3. partner header            8. required permissions
//! 4. unsigned token pre-parse  9. log context + success line
//! 5. session-store lookup     10. allow-list rewrite + envelope
//! ```
//!
//! # Design Decisions
//! - The pre-parse (step 4) only selects the session record; the
//!   signature check against that record's secret (step 6) is the
//!   trust decision
//! - Partner agreement is double-checked: the lookup key embeds the
//!   header partner, and the fetched record must carry it too

use std::time::Instant;

use axum::{
    body::Body,
    extract::Request,
    http::header::AUTHORIZATION,
};

use crate::error::{GatewayError, RejectReason};
use crate::http::headers;
use crate::http::middleware::CorrelationId;
use crate::session::{token, SessionStore};

/// Validation start time, stamped into request extensions for
/// latency reporting.
#[derive(Debug, Clone, Copy)]
pub struct ValidationStart(pub Instant);

/// Route-scoped validator, built once per protected route from its
/// configuration.
#[derive(Clone)]
pub struct SessionValidator {
    route: String,
    required_permissions: Vec<String>,
    partner_claim_check: bool,
    store: SessionStore,
}

impl SessionValidator {
    pub fn new(
        route: impl Into<String>,
        required_permissions: Vec<String>,
        partner_claim_check: bool,
        store: SessionStore,
    ) -> Self {
        Self {
            route: route.into(),
            required_permissions,
            partner_claim_check,
            store,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// Run the pipeline. On success the returned request carries only
    /// allow-listed inbound headers plus the injected envelope; on
    /// failure the request must not reach the upstream.
    pub async fn validate(
        &self,
        mut request: Request<Body>,
    ) -> Result<Request<Body>, GatewayError> {
        let started = Instant::now();
        request.extensions_mut().insert(ValidationStart(started));

        let authorization = require_header(&request, AUTHORIZATION.as_str())
            .ok_or(GatewayError::SessionInvalid(RejectReason::MissingAuthorization))?
            .to_string();

        let partner = require_header(&request, headers::PARTNER.as_str())
            .ok_or(GatewayError::SessionInvalid(RejectReason::MissingPartner))?
            .to_string();

        let claims =
            token::extract_claims(&authorization).map_err(GatewayError::SessionInvalid)?;

        // Defensive mode: a partner claim inside the token must agree
        // with the header before any lookup happens.
        if self.partner_claim_check {
            if let Some(token_partner) = &claims.partner {
                if !token_partner.eq_ignore_ascii_case(&partner) {
                    return Err(GatewayError::SessionInvalid(RejectReason::PartnerMismatch));
                }
            }
        }

        let record = self.store.get(&partner, &claims.session_id).await?;

        if !record.partner.eq_ignore_ascii_case(&partner) {
            return Err(GatewayError::SessionInvalid(RejectReason::PartnerMismatch));
        }

        if !token::verify(&authorization, &record.session_secret).await {
            return Err(GatewayError::SessionInvalid(RejectReason::SignatureInvalid));
        }

        if !record.has_valid_relationship() {
            return Err(GatewayError::SessionInvalid(
                RejectReason::NoRelationshipSelected,
            ));
        }

        if !record.has_permissions(&self.required_permissions) {
            return Err(GatewayError::InsufficientPermissions);
        }

        let span = tracing::Span::current();
        span.record("session_id", record.session_id.as_str());
        span.record("partner", record.partner.as_str());
        span.record("route", self.route.as_str());

        let correlation_id = request
            .extensions()
            .get::<CorrelationId>()
            .map(|id| id.0.clone())
            .unwrap_or_default();

        tracing::info!(
            session_id = %record.session_id,
            partner = %record.partner,
            route = %self.route,
            validation_ms = started.elapsed().as_millis() as u64,
            "Session validated"
        );

        let rewritten = headers::rewrite(request.headers(), record.to_headers(), &correlation_id);
        *request.headers_mut() = rewritten;

        Ok(request)
    }
}

fn require_header<'a>(request: &'a Request<Body>, name: &str) -> Option<&'a str> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
