//! Token parsing and verification.
//!
//! Two deliberately separate passes:
//!
//! 1. `extract_claims` reads the payload WITHOUT verifying the
//!    signature. Its only job is to locate the session record whose
//!    secret will verify the token; it never influences a trust
//!    decision on its own.
//! 2. `verify` is the authoritative HMAC-SHA256 check against the
//!    per-session secret from that record.
//!
//! Session-scoped keys limit the blast radius of a key compromise and
//! let the identity service rotate keys per session.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::RejectReason;
use crate::session::SessionSecret;

const BEARER_PREFIX: &str = "Bearer ";

/// Claims read by the unsigned pre-parse.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub session_id: String,
    /// Optional tenant claim; when present and partner-claim checking
    /// is enabled, it must agree with the partner header.
    pub partner: Option<String>,
}

#[derive(Deserialize)]
struct RawPayload {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    partner: Option<String>,
}

/// Unsigned pre-parse: strip the optional Bearer prefix, split the
/// compact form, base64url-decode the payload and read `sessionId`.
/// Any malformed input maps to the same rejection.
pub fn extract_claims(header_value: &str) -> Result<TokenClaims, RejectReason> {
    let token = strip_bearer(header_value);

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(RejectReason::MalformedToken);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| RejectReason::MalformedToken)?;

    let raw: RawPayload =
        serde_json::from_slice(&payload).map_err(|_| RejectReason::MalformedToken)?;

    let session_id = raw
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or(RejectReason::MalformedToken)?;

    Ok(TokenClaims {
        session_id,
        partner: raw.partner,
    })
}

/// Authoritative verification: HMAC-SHA256 over header+payload with
/// the session's secret as key. Any failure — bad signature, malformed
/// structure, wrong algorithm, expired claims if encoded — is `false`.
///
/// Runs on the blocking pool so the I/O dispatch threads stay free.
pub async fn verify(header_value: &str, secret: &SessionSecret) -> bool {
    let token = strip_bearer(header_value).to_string();
    let secret = secret.clone();

    tokio::task::spawn_blocking(move || verify_blocking(&token, secret.expose()))
        .await
        .unwrap_or(false)
}

fn verify_blocking(token: &str, secret: &str) -> bool {
    let mut validation = Validation::new(Algorithm::HS256);
    // `sessionId` is the only claim the gateway requires; `exp` is
    // enforced only when the identity service encoded one.
    validation.required_spec_claims.clear();
    validation.validate_aud = false;

    decode::<serde_json::Value>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .is_ok()
}

fn strip_bearer(value: &str) -> &str {
    value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim()
}
