// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Configuration
//!
//! [`AuthConfig`] is built once at startup, either with the builder methods
//! or from the environment, and is read-only afterwards.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SUPABASE_JWT_SECRET` | Shared HS256 secret | Required for `legacy` mode |
//! | `SUPABASE_JWKS_URL` | JWKS endpoint | Required for `jwks` mode |
//! | `AUTH_MODE` | `legacy` or `jwks` | `jwks` if a JWKS URL is set, else `legacy` |
//! | `JWT_AUDIENCE` | Expected `aud` claim | Unchecked |
//! | `JWT_ISSUER` | Expected `iss` claim | Unchecked |
//! | `JWT_LEEWAY_SECONDS` | Clock skew tolerated on `exp` (at most 86400) | `30` |
//! | `JWKS_FETCH_TIMEOUT_SECONDS` | Bound on one JWKS fetch | `10` |
//! | `DEV_MODE` | Enable the dev token bypass | `false` |
//! | `DEV_TOKEN` | Static development token | Required when `DEV_MODE` is on |
//! | `DEV_USER_ID` | `sub` of the dev identity | `dev-user` |
//! | `DEV_ROLE` | `role` of the dev identity | `authenticated` |
//! | `DEV_EMAIL` | `email` of the dev identity | None |
//! | `ORIGINS` | Comma-separated CORS origins (passed through) | Empty |

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Environment variable for the legacy shared secret.
pub const JWT_SECRET_ENV: &str = "SUPABASE_JWT_SECRET";
pub const JWKS_URL_ENV: &str = "SUPABASE_JWKS_URL";
pub const AUTH_MODE_ENV: &str = "AUTH_MODE";
pub const AUDIENCE_ENV: &str = "JWT_AUDIENCE";
pub const ISSUER_ENV: &str = "JWT_ISSUER";
pub const LEEWAY_ENV: &str = "JWT_LEEWAY_SECONDS";
pub const FETCH_TIMEOUT_ENV: &str = "JWKS_FETCH_TIMEOUT_SECONDS";
pub const DEV_MODE_ENV: &str = "DEV_MODE";
pub const DEV_TOKEN_ENV: &str = "DEV_TOKEN";
pub const DEV_USER_ID_ENV: &str = "DEV_USER_ID";
pub const DEV_ROLE_ENV: &str = "DEV_ROLE";
pub const DEV_EMAIL_ENV: &str = "DEV_EMAIL";
pub const ORIGINS_ENV: &str = "ORIGINS";

/// Default clock skew leeway on `exp`, in seconds.
pub const DEFAULT_LEEWAY_SECONDS: u64 = 30;

/// Largest accepted clock skew tolerance (one day).
pub const MAX_LEEWAY_SECONDS: u64 = 86_400;

/// Default bound on one JWKS fetch, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Default `sub` of the development identity.
pub const DEFAULT_DEV_USER_ID: &str = "dev-user";

/// Default `role` of the development identity.
pub const DEFAULT_DEV_ROLE: &str = "authenticated";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Which token verifier to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationMode {
    /// HS256 with one shared secret
    #[default]
    Legacy,
    /// Asymmetric keys from a JWKS endpoint
    Jwks,
}

impl std::str::FromStr for VerificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "hmac" | "hs256" => Ok(VerificationMode::Legacy),
            "jwks" => Ok(VerificationMode::Jwks),
            other => Err(format!("expected 'legacy' or 'jwks', got '{other}'")),
        }
    }
}

/// Identity returned for the development token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevIdentity {
    pub user_id: String,
    pub role: String,
    pub email: Option<String>,
}

impl Default for DevIdentity {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_DEV_USER_ID.to_string(),
            role: DEFAULT_DEV_ROLE.to_string(),
            email: None,
        }
    }
}

/// Authentication configuration.
///
/// The shared secret and dev token are redacted in Debug output.
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared secret for HS256 (legacy mode)
    pub jwt_secret: Option<String>,
    /// JWKS endpoint (JWKS mode)
    pub jwks_url: Option<String>,
    pub mode: VerificationMode,
    /// Expected audience; `aud` is not checked when unset
    pub audience: Option<String>,
    /// Expected issuer; `iss` is not checked when unset
    pub issuer: Option<String>,
    /// Clock skew tolerated on `exp`
    pub leeway_seconds: u64,
    pub jwks_fetch_timeout: Duration,
    pub dev_mode: bool,
    pub dev_token: Option<String>,
    pub dev_identity: DevIdentity,
    /// CORS origins; not used here, carried for the HTTP layer
    pub allowed_origins: Vec<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &redact(&self.jwt_secret))
            .field("jwks_url", &self.jwks_url)
            .field("mode", &self.mode)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("jwks_fetch_timeout", &self.jwks_fetch_timeout)
            .field("dev_mode", &self.dev_mode)
            .field("dev_token", &redact(&self.dev_token))
            .field("dev_identity", &self.dev_identity)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwks_url: None,
            mode: VerificationMode::default(),
            audience: None,
            issuer: None,
            leeway_seconds: DEFAULT_LEEWAY_SECONDS,
            jwks_fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS),
            dev_mode: false,
            dev_token: None,
            dev_identity: DevIdentity::default(),
            allowed_origins: Vec::new(),
        }
    }
}

impl AuthConfig {
    /// Legacy mode: verify HS256 tokens with `jwt_secret`.
    pub fn legacy(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: Some(jwt_secret.into()),
            mode: VerificationMode::Legacy,
            ..Default::default()
        }
    }

    /// JWKS mode: verify tokens with keys published at `jwks_url`.
    pub fn jwks(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: Some(jwks_url.into()),
            mode: VerificationMode::Jwks,
            ..Default::default()
        }
    }

    /// Set the expected audience.
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set the expected issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_jwks_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.jwks_fetch_timeout = timeout;
        self
    }

    /// Turn on development mode with this static token.
    pub fn with_dev_token(mut self, token: impl Into<String>) -> Self {
        self.dev_mode = true;
        self.dev_token = Some(token.into());
        self
    }

    pub fn with_dev_identity(mut self, identity: DevIdentity) -> Self {
        self.dev_identity = identity;
        self
    }

    pub fn with_allowed_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get(JWT_SECRET_ENV);
        let jwks_url = get(JWKS_URL_ENV);

        let mode = match get(AUTH_MODE_ENV) {
            Some(value) => value.parse().map_err(|reason| ConfigError::Invalid {
                name: AUTH_MODE_ENV,
                reason,
            })?,
            None if jwks_url.is_some() => VerificationMode::Jwks,
            None => VerificationMode::Legacy,
        };

        let leeway_seconds = match get(LEEWAY_ENV) {
            Some(value) => value.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: LEEWAY_ENV,
                reason: format!("must be a non-negative integer, got '{value}': {e}"),
            })?,
            None => DEFAULT_LEEWAY_SECONDS,
        };

        let fetch_timeout_seconds = match get(FETCH_TIMEOUT_ENV) {
            Some(value) => value.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: FETCH_TIMEOUT_ENV,
                reason: format!("must be a positive integer, got '{value}': {e}"),
            })?,
            None => DEFAULT_FETCH_TIMEOUT_SECONDS,
        };

        let dev_mode = match get(DEV_MODE_ENV) {
            Some(value) => parse_flag(&value).ok_or_else(|| ConfigError::Invalid {
                name: DEV_MODE_ENV,
                reason: format!("expected true/false, got '{value}'"),
            })?,
            None => false,
        };

        let dev_identity = DevIdentity {
            user_id: get(DEV_USER_ID_ENV).unwrap_or_else(|| DEFAULT_DEV_USER_ID.to_string()),
            role: get(DEV_ROLE_ENV).unwrap_or_else(|| DEFAULT_DEV_ROLE.to_string()),
            email: get(DEV_EMAIL_ENV),
        };

        let allowed_origins = get(ORIGINS_ENV)
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let config = Self {
            jwt_secret,
            jwks_url,
            mode,
            audience: get(AUDIENCE_ENV),
            issuer: get(ISSUER_ENV),
            leeway_seconds,
            jwks_fetch_timeout: Duration::from_secs(fetch_timeout_seconds),
            dev_mode,
            dev_token: get(DEV_TOKEN_ENV),
            dev_identity,
            allowed_origins,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            VerificationMode::Legacy => {
                if self.jwt_secret.as_deref().is_none_or(str::is_empty) {
                    return Err(ConfigError::Missing(JWT_SECRET_ENV));
                }
            }
            VerificationMode::Jwks => {
                let raw = self
                    .jwks_url
                    .as_deref()
                    .ok_or(ConfigError::Missing(JWKS_URL_ENV))?;
                let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
                    name: JWKS_URL_ENV,
                    reason: format!("'{raw}' is not a valid URL: {e}"),
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(ConfigError::Invalid {
                        name: JWKS_URL_ENV,
                        reason: format!("unsupported scheme '{}'", url.scheme()),
                    });
                }
            }
        }

        if self.leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(ConfigError::Invalid {
                name: LEEWAY_ENV,
                reason: format!(
                    "{}s exceeds the maximum of {MAX_LEEWAY_SECONDS}s",
                    self.leeway_seconds
                ),
            });
        }

        if self.jwks_fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: FETCH_TIMEOUT_ENV,
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.dev_mode && self.dev_token.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Missing(DEV_TOKEN_ENV));
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
