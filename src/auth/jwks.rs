// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching, caching and key resolution.
//!
//! ## Caching
//!
//! - One JWKS document is cached, with a fixed TTL (1 hour by default)
//! - An expired document is discarded before the refresh, never served
//! - Concurrent misses share one in-flight fetch
//! - A miss never takes longer than the fetch timeout, queueing included
//! - Fetch failures surface as [`AuthError::KeySourceUnavailable`]
//!
//! ## Key selection
//!
//! [`resolve`] matches on `kid` AND `alg`. The algorithm the verifier uses is
//! the one the key publisher attached to that key id, so a token cannot pick
//! its own algorithm.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::AuthError;

/// Default JWKS cache TTL (1 hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default bound on a single JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A JWKS document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

/// One published key.
///
/// Only the members needed for signature verification are kept. Unknown
/// members (`use`, `key_ops`, `x5c`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC", "OKP")
    pub kty: String,

    #[serde(default)]
    pub kid: Option<String>,

    #[serde(default)]
    pub alg: Option<String>,

    // RSA
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    // EC / OKP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

/// JWKS cache entry.
struct CacheEntry {
    jwks: Arc<JwksDocument>,
    fetched_at: Instant,
}

/// Single-slot JWKS cache backed by one remote endpoint.
#[derive(Clone)]
pub struct KeyCache {
    /// JWKS endpoint
    jwks_url: String,
    cache_ttl: Duration,
    fetch_timeout: Duration,
    /// Cached document; replaced wholesale, never edited in place
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Serializes refreshes so concurrent misses share one fetch
    refresh_lock: Arc<Mutex<()>>,
    client: reqwest::Client,
}

impl KeyCache {
    /// Create a cache for `jwks_url` using the caller's HTTP client.
    ///
    /// Every fetch is additionally bounded by [`DEFAULT_FETCH_TIMEOUT`]
    /// unless overridden with [`with_fetch_timeout`](Self::with_fetch_timeout).
    pub fn new(jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(())),
            client,
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with a custom bound on each fetch.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Get the JWKS document, fetching it if the cached one is missing or expired.
    ///
    /// A miss, including the wait behind another task's refresh, is bounded
    /// by the fetch timeout as a whole.
    pub async fn get_jwks(&self) -> Result<Arc<JwksDocument>, AuthError> {
        if let Some(jwks) = self.cached().await {
            return Ok(jwks);
        }

        self.bounded(async {
            let _refresh = self.refresh_lock.lock().await;

            // Another task may have refreshed while we waited for the lock
            if let Some(jwks) = self.cached().await {
                return Ok(jwks);
            }

            self.replace().await
        })
        .await
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.bounded(async {
            let _refresh = self.refresh_lock.lock().await;
            self.replace().await
        })
        .await
        .map(|_| ())
    }

    /// Run `fut` under `fetch_timeout`, mapping expiry to
    /// [`AuthError::KeySourceUnavailable`].
    async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, AuthError>>,
    ) -> Result<T, AuthError> {
        tokio::time::timeout(self.fetch_timeout, fut)
            .await
            .unwrap_or_else(|_| Err(self.timed_out()))
    }

    fn timed_out(&self) -> AuthError {
        AuthError::KeySourceUnavailable(format!(
            "timed out after {}ms",
            self.fetch_timeout.as_millis()
        ))
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        self.cached().await.is_some()
    }

    /// Fresh cached document, if any.
    async fn cached(&self) -> Option<Arc<JwksDocument>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| Arc::clone(&entry.jwks))
    }

    /// Drop the current entry, fetch a new one and store it.
    ///
    /// Caller must hold `refresh_lock`.
    async fn replace(&self) -> Result<Arc<JwksDocument>, AuthError> {
        self.cache.write().await.take();

        let jwks = Arc::new(self.fetch_jwks().await?);

        *self.cache.write().await = Some(CacheEntry {
            jwks: Arc::clone(&jwks),
            fetched_at: Instant::now(),
        });

        Ok(jwks)
    }

    /// Fetch JWKS from the endpoint, bounded by `fetch_timeout`.
    async fn fetch_jwks(&self) -> Result<JwksDocument, AuthError> {
        let result = tokio::time::timeout(self.fetch_timeout, self.fetch_jwks_unbounded())
            .await
            .unwrap_or_else(|_| Err(self.timed_out()));

        match &result {
            Ok(jwks) => info!(
                url = %self.jwks_url,
                keys = jwks.keys.len(),
                "Fetched JWKS"
            ),
            Err(e) => warn!(url = %self.jwks_url, error = %e, "JWKS fetch failed"),
        }

        result
    }

    async fn fetch_jwks_unbounded(&self) -> Result<JwksDocument, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::KeySourceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::KeySourceUnavailable(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwksDocument>()
            .await
            .map_err(|e| AuthError::KeySourceUnavailable(format!("malformed key set: {e}")))
    }
}

/// Find the key for `kid`/`alg` in `jwks` and turn it into a decoding key.
///
/// Returns the algorithm to verify with alongside the key; it is always the
/// one the JWKS pairs with `kid`.
pub fn resolve(
    kid: &str,
    alg: &str,
    jwks: &JwksDocument,
) -> Result<(DecodingKey, Algorithm), AuthError> {
    let unknown = |detail: String| AuthError::UnknownKey {
        kid: kid.to_string(),
        alg: alg.to_string(),
        detail,
    };

    let jwk = jwks
        .keys
        .iter()
        .find(|k| k.kid.as_deref() == Some(kid) && k.alg.as_deref() == Some(alg))
        .ok_or_else(|| unknown("no key with this id and algorithm".to_string()))?;

    let algorithm: Algorithm = alg
        .parse()
        .map_err(|_| unknown("unsupported algorithm".to_string()))?;

    let key = jwk_to_decoding_key(jwk, algorithm).map_err(|detail| {
        debug!(kid, alg, %detail, "Unusable JWK");
        unknown(detail)
    })?;

    Ok((key, algorithm))
}

/// Convert a JWK to a DecodingKey for `algorithm`.
fn jwk_to_decoding_key(jwk: &Jwk, algorithm: Algorithm) -> Result<DecodingKey, String> {
    let member = |value: &Option<String>, name: &str| {
        value
            .as_deref()
            .ok_or_else(|| format!("{} JWK missing {name}", jwk.kty))
            .map(str::to_string)
    };

    match (algorithm, jwk.kty.as_str()) {
        (
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512,
            "RSA",
        ) => {
            let n = member(&jwk.n, "n")?;
            let e = member(&jwk.e, "e")?;
            DecodingKey::from_rsa_components(&n, &e)
                .map_err(|e| format!("Failed to create RSA key: {e}"))
        }
        (Algorithm::ES256 | Algorithm::ES384, "EC") => {
            let expected_crv = if algorithm == Algorithm::ES256 {
                "P-256"
            } else {
                "P-384"
            };
            let crv = member(&jwk.crv, "crv")?;
            if crv != expected_crv {
                return Err(format!("curve {crv} does not match {algorithm:?}"));
            }
            let x = member(&jwk.x, "x")?;
            let y = member(&jwk.y, "y")?;
            DecodingKey::from_ec_components(&x, &y)
                .map_err(|e| format!("Failed to create EC key: {e}"))
        }
        (Algorithm::EdDSA, "OKP") => {
            let crv = member(&jwk.crv, "crv")?;
            if crv != "Ed25519" {
                return Err(format!("unsupported OKP curve: {crv}"));
            }
            let x = member(&jwk.x, "x")?;
            DecodingKey::from_ed_components(&x)
                .map_err(|e| format!("Failed to create Ed25519 key: {e}"))
        }
        (algorithm, kty) => Err(format!(
            "key type {kty} cannot verify {algorithm:?} signatures"
        )),
    }
}
