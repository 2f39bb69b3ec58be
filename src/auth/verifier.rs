// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token verifiers.
//!
//! Two variants share one contract, `verify(token) -> RawClaimSet`:
//!
//! - [`HmacVerifier`]: legacy Supabase tokens, HS256 with the project secret
//! - [`JwksVerifier`]: asymmetric tokens, key picked from the JWKS by `kid`/`alg`
//!
//! Both check, in order: signature, `exp` (with leeway), `aud` and `iss`
//! (each only when configured). `nbf` and `iat` are not checked.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::Value;

use super::jwks::{self, KeyCache};
use super::{AuthError, RawClaimSet};
use crate::config::{AuthConfig, MAX_LEEWAY_SECONDS};

/// Claim checks shared by both variants.
#[derive(Debug, Clone)]
struct ClaimRules {
    audience: Option<String>,
    issuer: Option<String>,
    leeway_seconds: u64,
}

impl ClaimRules {
    fn from_config(config: &AuthConfig) -> Self {
        Self {
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
            // jsonwebtoken subtracts leeway from the current time unchecked
            leeway_seconds: config.leeway_seconds.min(MAX_LEEWAY_SECONDS),
        }
    }

    /// Validation pinned to exactly one algorithm.
    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        validation.leeway = self.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = false;

        // Validate audience if configured
        if let Some(ref audience) = self.audience {
            validation.set_audience(&[audience]);
        } else {
            validation.validate_aud = false;
        }

        // Validate issuer if configured
        if let Some(ref issuer) = self.issuer {
            validation.set_issuer(&[issuer]);
        }

        validation
    }
}

/// Verifies HS256 tokens signed with one shared secret.
#[derive(Clone)]
pub struct HmacVerifier {
    key: DecodingKey,
    rules: ClaimRules,
}

impl HmacVerifier {
    pub fn new(secret: &str, config: &AuthConfig) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            rules: ClaimRules::from_config(config),
        }
    }

    /// Verify `token` and return its claims.
    ///
    /// The algorithm is fixed to HS256; whatever the header declares
    /// otherwise is rejected.
    pub fn verify(&self, token: &str) -> Result<RawClaimSet, AuthError> {
        let validation = self.rules.validation(Algorithm::HS256);
        let token_data = decode::<RawClaimSet>(token, &self.key, &validation)?;
        Ok(token_data.claims)
    }
}

/// Verifies asymmetric tokens against a JWKS endpoint.
#[derive(Clone)]
pub struct JwksVerifier {
    keys: KeyCache,
    rules: ClaimRules,
}

impl JwksVerifier {
    pub fn new(keys: KeyCache, config: &AuthConfig) -> Self {
        Self {
            keys,
            rules: ClaimRules::from_config(config),
        }
    }

    /// Replace the cache TTL of the underlying [`KeyCache`].
    pub fn with_cache_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.keys = self.keys.with_cache_ttl(ttl);
        self
    }

    /// The key cache this verifier reads from.
    pub fn key_cache(&self) -> &KeyCache {
        &self.keys
    }

    /// Verify `token` and return its claims.
    pub async fn verify(&self, token: &str) -> Result<RawClaimSet, AuthError> {
        let (kid, alg) = unverified_kid_and_alg(token)?;

        let jwks = self.keys.get_jwks().await?;
        let (decoding_key, algorithm) = jwks::resolve(&kid, &alg, &jwks)?;

        let validation = self.rules.validation(algorithm);
        let token_data = decode::<RawClaimSet>(token, &decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

/// Read `kid` and `alg` from the token header without verifying anything.
///
/// `jsonwebtoken::decode_header` fails on a missing `alg` with a generic
/// parse error, so the header is decoded here to report it as
/// [`AuthError::MalformedHeader`].
fn unverified_kid_and_alg(token: &str) -> Result<(String, String), AuthError> {
    let header_b64 = token
        .split('.')
        .next()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| AuthError::InvalidToken("Not enough segments".into()))?;

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64.trim_end_matches('='))
        .map_err(|e| AuthError::InvalidToken(format!("Invalid header padding: {e}")))?;

    let header: Value = serde_json::from_slice(&header_bytes)
        .map_err(|e| AuthError::InvalidToken(format!("Invalid header string: {e}")))?;

    let field = |name: &str| {
        header
            .get(name)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    match (field("kid"), field("alg")) {
        (Some(kid), Some(alg)) => Ok((kid, alg)),
        (None, _) => Err(AuthError::MalformedHeader("kid is missing".into())),
        (_, None) => Err(AuthError::MalformedHeader("alg is missing".into())),
    }
}

/// The verifier selected for this process.
#[derive(Clone)]
pub enum Verifier {
    Hmac(HmacVerifier),
    Jwks(JwksVerifier),
}

impl Verifier {
    pub async fn verify(&self, token: &str) -> Result<RawClaimSet, AuthError> {
        match self {
            Verifier::Hmac(verifier) => verifier.verify(token),
            Verifier::Jwks(verifier) => verifier.verify(token).await,
        }
    }
}
