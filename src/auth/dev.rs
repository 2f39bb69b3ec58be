// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Development token bypass.
//!
//! WARNING: local development only. When armed, the configured dev token is
//! the *only* token accepted; real tokens are rejected with
//! [`AuthError::InvalidDevToken`] instead of being verified.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::warn;

use super::{AuthError, RawClaimSet};
use crate::config::{AuthConfig, DevIdentity};

/// Lifetime of the synthetic dev claims.
const DEV_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Short-circuits verification with a static development token.
#[derive(Clone)]
pub struct DevBypass {
    token: String,
    identity: DevIdentity,
    audience: Option<String>,
    issuer: Option<String>,
}

impl std::fmt::Debug for DevBypass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevBypass")
            .field("token", &"[REDACTED]")
            .field("identity", &self.identity)
            .finish()
    }
}

impl DevBypass {
    /// Arm the bypass if development mode is on and a dev token is set.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        if !config.dev_mode {
            return None;
        }
        let token = config.dev_token.clone().filter(|t| !t.is_empty())?;

        warn!(
            user_id = %config.dev_identity.user_id,
            "Development token bypass is enabled; real tokens will be rejected"
        );

        Some(Self {
            token,
            identity: config.dev_identity.clone(),
            audience: config.audience.clone(),
            issuer: config.issuer.clone(),
        })
    }

    /// Synthetic claims for the dev token, or [`AuthError::InvalidDevToken`].
    pub fn check(&self, token: &str) -> Result<RawClaimSet, AuthError> {
        if token != self.token {
            return Err(AuthError::InvalidDevToken);
        }

        let mut claims = RawClaimSet::new();
        claims.insert("sub".into(), json!(self.identity.user_id));
        claims.insert("role".into(), json!(self.identity.role));
        if let Some(email) = &self.identity.email {
            claims.insert("email".into(), json!(email));
        }
        claims.insert(
            "exp".into(),
            json!(Utc::now().timestamp() + DEV_TOKEN_LIFETIME_SECS),
        );
        if let Some(aud) = &self.audience {
            claims.insert("aud".into(), json!(aud));
        }
        if let Some(iss) = &self.issuer {
            claims.insert("iss".into(), json!(iss));
        }
        claims.insert("is_anonymous".into(), Value::Bool(false));

        Ok(claims)
    }
}
