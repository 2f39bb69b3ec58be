// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The entry point request handlers depend on.
//!
//! The HTTP layer extracts the bearer token and hands it over:
//!
//! ```rust,ignore
//! let auth = Authenticator::new(AuthConfig::from_env()?)?;
//!
//! // per request
//! let identity = auth.authenticate(token).await?;
//! auth.require_any_role(&identity, &["admin"])?;
//! ```
//!
//! Failures come back as [`AuthError`]; the caller picks a status code from
//! [`AuthError::class`].

use std::time::Duration;

use tracing::debug;

use super::dev::DevBypass;
use super::jwks::KeyCache;
use super::policy::{self, Guard};
use super::verifier::{HmacVerifier, JwksVerifier, Verifier};
use super::{to_identity, AuthError, Identity, RawClaimSet};
use crate::config::{AuthConfig, ConfigError, VerificationMode};

/// Verifies bearer tokens and maps them to an [`Identity`].
///
/// Cheap to clone; clones share the JWKS cache.
#[derive(Clone)]
pub struct Authenticator {
    verifier: Verifier,
    dev_bypass: Option<DevBypass>,
}

impl Authenticator {
    /// Build from a configuration, using a default HTTP client for JWKS fetches.
    pub fn new(config: AuthConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.jwks_fetch_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Self::with_http_client(config, client)
    }

    /// Build from a configuration and a caller-provided HTTP client.
    ///
    /// Only JWKS mode uses the client.
    pub fn with_http_client(
        config: AuthConfig,
        client: reqwest::Client,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let verifier = match config.mode {
            VerificationMode::Legacy => {
                let secret = config
                    .jwt_secret
                    .as_deref()
                    .ok_or(ConfigError::Missing(crate::config::JWT_SECRET_ENV))?;
                Verifier::Hmac(HmacVerifier::new(secret, &config))
            }
            VerificationMode::Jwks => {
                let url = config
                    .jwks_url
                    .clone()
                    .ok_or(ConfigError::Missing(crate::config::JWKS_URL_ENV))?;
                let keys = KeyCache::new(url, client).with_fetch_timeout(config.jwks_fetch_timeout);
                Verifier::Jwks(JwksVerifier::new(keys, &config))
            }
        };

        Ok(Self {
            verifier,
            dev_bypass: DevBypass::from_config(&config),
        })
    }

    /// Override the JWKS cache TTL. No effect in legacy mode.
    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.verifier = match self.verifier {
            Verifier::Jwks(verifier) => Verifier::Jwks(verifier.with_cache_ttl(ttl)),
            hmac => hmac,
        };
        self
    }

    /// Which verifier this authenticator was built with.
    pub fn mode(&self) -> VerificationMode {
        match self.verifier {
            Verifier::Hmac(_) => VerificationMode::Legacy,
            Verifier::Jwks(_) => VerificationMode::Jwks,
        }
    }

    /// The JWKS cache, in JWKS mode.
    pub fn key_cache(&self) -> Option<&KeyCache> {
        match &self.verifier {
            Verifier::Jwks(verifier) => Some(verifier.key_cache()),
            Verifier::Hmac(_) => None,
        }
    }

    /// Verify `token` and return its raw claims.
    ///
    /// With the dev bypass armed only the dev token is accepted.
    pub async fn verify(&self, token: &str) -> Result<RawClaimSet, AuthError> {
        if let Some(bypass) = &self.dev_bypass {
            return bypass.check(token);
        }
        self.verifier.verify(token).await
    }

    /// Verify `token` and map its claims to an [`Identity`].
    pub async fn authenticate(&self, token: &str) -> Result<Identity, AuthError> {
        let result = self.verify(token).await.and_then(to_identity);

        if let Err(e) = &result {
            debug!(code = e.code(), "Token rejected");
        }

        result
    }

    /// Authenticate, then apply `guards` in order.
    pub async fn authenticate_with(
        &self,
        token: &str,
        guards: &[Guard],
    ) -> Result<Identity, AuthError> {
        let identity = self.authenticate(token).await?;

        for guard in guards {
            if let Err(e) = guard.check(&identity) {
                debug!(user_id = %identity.user_id, code = e.code(), "Access denied");
                return Err(e);
            }
        }

        Ok(identity)
    }

    /// See [`policy::require_any_role`].
    pub fn require_any_role<S: AsRef<str>>(
        &self,
        identity: &Identity,
        allowed_roles: &[S],
    ) -> Result<(), AuthError> {
        policy::require_any_role(identity, allowed_roles)
    }

    /// See [`policy::require_not_anonymous`].
    pub fn require_not_anonymous(&self, identity: &Identity) -> Result<(), AuthError> {
        policy::require_not_anonymous(identity)
    }
}
