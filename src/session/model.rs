//! Session record model and derivations.
//!
//! Records are produced by the identity service and read verbatim from
//! the shared cache; decoding tolerates unknown fields so the identity
//! service can evolve its schema without lockstep deploys. Missing
//! required fields are a decode failure.

use std::collections::BTreeSet;

use axum::http::HeaderName;
use serde::Deserialize;

use crate::http::headers;

/// HMAC-SHA256 key material for one session. Redacted from Debug
/// output so records can be logged without leaking the key.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SessionSecret(String);

impl SessionSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}

/// User identity fields carried by the session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub document_number: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
}

/// Fund the user is operating under.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fund {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub fund_type: String,
}

/// One contractual relationship between the user and a fund.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub name: String,
    pub status: String,
    pub contract_number: String,
}

/// A per-user authenticated context, keyed in the shared cache by
/// `fidc:session:{partner}:{sessionId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub partner: String,
    pub session_secret: SessionSecret,
    pub user_info: UserInfo,
    pub fund: Fund,
    #[serde(default)]
    pub relationship_list: Vec<Relationship>,
    #[serde(default)]
    pub relationship_selected: Option<Relationship>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl SessionRecord {
    /// Cache key for a session lookup. The partner comes from the
    /// request header; agreement with the record's own `partner` field
    /// is checked separately after the read.
    pub fn cache_key(partner: &str, session_id: &str) -> String {
        format!("fidc:session:{}:{}", partner, session_id)
    }

    /// A session can only authorize requests with a selected relationship.
    pub fn has_valid_relationship(&self) -> bool {
        self.relationship_selected.is_some()
    }

    /// Set containment: every required code must be present.
    /// Comparison is case-sensitive; codes are uppercase by convention.
    pub fn has_permissions(&self, required: &[String]) -> bool {
        required.iter().all(|code| self.permissions.contains(code))
    }

    /// Deterministic mapping to the trusted header envelope.
    ///
    /// Optional fields are omitted when empty; permissions are joined
    /// by comma with no spaces, in set order.
    pub fn to_headers(&self) -> Vec<(HeaderName, String)> {
        let mut pairs: Vec<(HeaderName, String)> = Vec::with_capacity(10);

        let mut push = |name: &HeaderName, value: &str| {
            if !value.is_empty() {
                pairs.push((name.clone(), value.to_string()));
            }
        };

        push(&headers::USER_DOCUMENT_NUMBER, &self.user_info.document_number);
        push(&headers::USER_EMAIL, &self.user_info.email);
        push(&headers::USER_NAME, &self.user_info.full_name);
        push(&headers::FUND_ID, &self.fund.id);
        push(&headers::FUND_NAME, &self.fund.name);
        push(&headers::PARTNER, &self.partner);
        push(&headers::SESSION_ID, &self.session_id);

        if let Some(relationship) = &self.relationship_selected {
            push(&headers::RELATIONSHIP_ID, &relationship.id);
            push(&headers::CONTRACT_NUMBER, &relationship.contract_number);
        }

        let joined = self
            .permissions
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(",");
        push(&headers::USER_PERMISSIONS, &joined);

        pairs
    }
}
