// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated identity representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::AuthError;

/// Claim set exactly as decoded from a verified token payload.
pub type RawClaimSet = Map<String, Value>;

/// The `aud` claim, which may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// True if `expected` is (one of) the audience values.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::Single(aud) => aud == expected,
            Audience::Multiple(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// Claims the mapper reads from a Supabase token.
///
/// Every field is optional at this layer so that absence and wrong type can
/// be reported separately.
#[derive(Debug, Deserialize)]
struct SupabaseClaims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    exp: Option<Number>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    is_anonymous: Option<bool>,
}

/// Authenticated identity extracted from a verified token.
///
/// This is the type request handlers receive from
/// [`Authenticator::authenticate`](super::Authenticator::authenticate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    /// Role claim, if present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Token expiration
    pub expires_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Audience>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Supabase anonymous sign-in; assumed true when the claim is absent
    pub is_anonymous: bool,
}

impl Identity {
    /// Build an identity from a claim set that already passed verification.
    ///
    /// Signature validity says nothing about claim completeness, so the
    /// subject is checked here again.
    pub fn from_claims(claims: RawClaimSet) -> Result<Self, AuthError> {
        let claims: SupabaseClaims = serde_json::from_value(Value::Object(claims))
            .map_err(|e| AuthError::InvalidToken(format!("Malformed claims: {e}")))?;

        let user_id = match claims.sub {
            Some(Value::String(sub)) if !sub.is_empty() => sub,
            _ => return Err(AuthError::MissingSubject),
        };

        let exp = claims
            .exp
            .ok_or_else(|| AuthError::InvalidToken("Token is missing the \"exp\" claim".into()))?;
        let expires_at = timestamp_to_instant(&exp)?;

        Ok(Self {
            user_id,
            role: claims.role,
            email: claims.email,
            expires_at,
            audience: claims.aud,
            issuer: claims.iss,
            is_anonymous: claims.is_anonymous.unwrap_or(true),
        })
    }

    /// Check if the identity carries exactly this role.
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

/// Normalize a verified claim set into an [`Identity`].
pub fn to_identity(claims: RawClaimSet) -> Result<Identity, AuthError> {
    Identity::from_claims(claims)
}

/// Convert a NumericDate to an instant, truncating sub-second precision.
///
/// Tokens from either verifier only reach here with an integer `exp`;
/// verification rejects fractional values as `invalid_token`.
fn timestamp_to_instant(exp: &Number) -> Result<DateTime<Utc>, AuthError> {
    let secs = match exp.as_i64() {
        Some(secs) => secs,
        None => exp
            .as_f64()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64)
            .ok_or_else(|| AuthError::InvalidToken(format!("Invalid exp claim: {exp}")))?,
    };

    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| AuthError::InvalidToken(format!("exp claim out of range: {secs}")))
}
