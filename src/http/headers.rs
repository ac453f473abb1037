//! Header envelope and inbound allow-list.
//!
//! # Responsibilities
//! - Name the canonical headers injected from a validated session
//! - Define which inbound headers may be forwarded upstream
//! - Build the rewritten header map: allow-listed inbound + envelope
//!
//! # Design Decisions
//! - Explicit set membership instead of copy-all-headers; anything
//!   not listed is dropped before upstream dispatch
//! - Envelope values always overwrite inbound values of the same
//!   name, never merge — the envelope is trusted, the inbound is not
//! - The allow-list is static; it is part of the wire contract

use axum::http::{HeaderMap, HeaderName, HeaderValue};

// Envelope headers, injected from the validated session record.
pub static USER_DOCUMENT_NUMBER: HeaderName = HeaderName::from_static("userdocumentnumber");
pub static USER_EMAIL: HeaderName = HeaderName::from_static("useremail");
pub static USER_NAME: HeaderName = HeaderName::from_static("username");
pub static FUND_ID: HeaderName = HeaderName::from_static("fundid");
pub static FUND_NAME: HeaderName = HeaderName::from_static("fundname");
pub static PARTNER: HeaderName = HeaderName::from_static("partner");
pub static SESSION_ID: HeaderName = HeaderName::from_static("sessionid");
pub static RELATIONSHIP_ID: HeaderName = HeaderName::from_static("relationshipid");
pub static CONTRACT_NUMBER: HeaderName = HeaderName::from_static("contractnumber");
pub static USER_PERMISSIONS: HeaderName = HeaderName::from_static("userpermissions");

/// Correlation header, set on every request and response.
pub static X_CORRELATION_ID: HeaderName = HeaderName::from_static("x-correlation-id");

/// Inbound headers allowed through to the upstream.
static FORWARD_ALLOW_LIST: [HeaderName; 17] = [
    // Content negotiation.
    HeaderName::from_static("accept"),
    HeaderName::from_static("accept-charset"),
    HeaderName::from_static("accept-encoding"),
    HeaderName::from_static("accept-language"),
    HeaderName::from_static("content-length"),
    HeaderName::from_static("content-type"),
    // Correlation / tracing.
    HeaderName::from_static("x-correlation-id"),
    HeaderName::from_static("x-request-id"),
    HeaderName::from_static("traceparent"),
    HeaderName::from_static("x-b3-traceid"),
    HeaderName::from_static("x-b3-spanid"),
    // Client and API version hints.
    HeaderName::from_static("user-agent"),
    HeaderName::from_static("x-api-version"),
    HeaderName::from_static("x-client-version"),
    // Cache validation.
    HeaderName::from_static("if-none-match"),
    HeaderName::from_static("if-modified-since"),
    HeaderName::from_static("cache-control"),
];

/// Whether an inbound header may be forwarded upstream.
pub fn is_forwardable(name: &HeaderName) -> bool {
    FORWARD_ALLOW_LIST.contains(name)
}

/// Build the outbound header map for a validated request.
///
/// Keeps exactly the allow-listed inbound headers, then sets every
/// envelope pair and the correlation id on top.
pub fn rewrite(
    inbound: &HeaderMap,
    envelope: Vec<(HeaderName, String)>,
    correlation_id: &str,
) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len() + envelope.len() + 1);

    for (name, value) in inbound {
        if is_forwardable(name) {
            outbound.append(name.clone(), value.clone());
        }
    }

    for (name, value) in envelope {
        if let Ok(value) = HeaderValue::from_str(&value) {
            outbound.insert(name, value);
        }
    }

    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        outbound.insert(X_CORRELATION_ID.clone(), value);
    }

    outbound
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound() -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert("accept", HeaderValue::from_static("application/json"));
        map.insert("authorization", HeaderValue::from_static("Bearer tok"));
        map.insert("cookie", HeaderValue::from_static("session=abc"));
        map.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        // Spoofed envelope value; must be overwritten.
        map.insert("sessionid", HeaderValue::from_static("spoofed"));
        map
    }

    #[test]
    fn test_rewrite_drops_unlisted_headers() {
        let outbound = rewrite(&inbound(), vec![], "cid-1");

        assert!(outbound.contains_key("accept"));
        assert!(!outbound.contains_key("authorization"));
        assert!(!outbound.contains_key("cookie"));
        assert!(!outbound.contains_key("x-forwarded-for"));
    }

    #[test]
    fn test_envelope_overwrites_inbound() {
        let envelope = vec![(SESSION_ID.clone(), "s-1".to_string())];
        let outbound = rewrite(&inbound(), envelope, "cid-1");

        assert_eq!(outbound.get("sessionid").unwrap(), "s-1");
    }

    #[test]
    fn test_correlation_id_always_set() {
        let outbound = rewrite(&HeaderMap::new(), vec![], "cid-9");
        assert_eq!(outbound.get("x-correlation-id").unwrap(), "cid-9");
    }

    #[test]
    fn test_every_outbound_name_is_allowed_or_envelope() {
        let envelope = vec![
            (PARTNER.clone(), "prevcom".to_string()),
            (SESSION_ID.clone(), "s-1".to_string()),
        ];
        let outbound = rewrite(&inbound(), envelope.clone(), "cid-1");

        for name in outbound.keys() {
            let is_envelope = envelope.iter().any(|(n, _)| n == name)
                || name == &X_CORRELATION_ID
                || name == &SESSION_ID;
            assert!(
                is_forwardable(name) || is_envelope,
                "unexpected outbound header: {}",
                name
            );
        }
    }
}
