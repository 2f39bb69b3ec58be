// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use serde::Serialize;
use thiserror::Error;

/// How a collaborator should surface an [`AuthError`] at the protocol level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The caller could not be authenticated.
    Unauthenticated,
    /// The caller is authenticated but not allowed.
    Forbidden,
    /// Key material could not be obtained; not the caller's fault.
    ServiceUnavailable,
}

impl ErrorClass {
    /// Conventional HTTP status for this class (401 / 403 / 500).
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorClass::Unauthenticated => 401,
            ErrorClass::Forbidden => 403,
            ErrorClass::ServiceUnavailable => 500,
        }
    }
}

/// Authentication and authorization error type.
///
/// Every failure raised while verifying a token, mapping its claims or
/// applying a policy guard ends up here. The variant decides the stable
/// [`code`](AuthError::code) and [`class`](AuthError::class); the display
/// string is the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Signature valid but `exp` is in the past beyond the leeway
    #[error("Token has expired")]
    TokenExpired,
    /// Structurally invalid, bad signature, or audience/issuer mismatch
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    /// Header lacks `kid` or `alg`
    #[error("Missing Key ID or Algorithm in token header: {0}")]
    MalformedHeader(String),
    /// No usable key for the header's `kid`/`alg` pair
    #[error("Invalid Key ID or Algorithm (kid={kid}, alg={alg}): {detail}")]
    UnknownKey {
        kid: String,
        alg: String,
        detail: String,
    },
    /// Verified token has no usable `sub` claim
    #[error("Token missing required sub claim")]
    MissingSubject,
    /// Development mode is on and the presented token is not the dev token
    #[error("Invalid development token")]
    InvalidDevToken,
    /// JWKS endpoint unreachable, timed out, or returned garbage
    #[error("Failed to fetch JWKS: {0}")]
    KeySourceUnavailable(String),
    /// Authenticated, but the role is not one of the allowed roles
    #[error("Required roles: {required:?}, current role: {actual:?}")]
    InsufficientPermissions {
        required: Vec<String>,
        actual: Option<String>,
    },
    /// Authenticated anonymously where a real account is required
    #[error("Anonymous users are not allowed to access this endpoint")]
    AnonymousAccessDenied,
    /// Anything that fits none of the above
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

/// JSON body a collaborator may send back for an [`AuthError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthErrorBody {
    pub error: String,
    pub error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::MalformedHeader(_) => "missing_kid_or_alg",
            AuthError::UnknownKey { .. } => "invalid_kid",
            AuthError::MissingSubject => "missing_sub_claim",
            AuthError::InvalidDevToken => "invalid_dev_token",
            AuthError::KeySourceUnavailable(_) => "jwks_fetch_failed",
            AuthError::InsufficientPermissions { .. } => "insufficient_permissions",
            AuthError::AnonymousAccessDenied => "anonymous_access_denied",
            AuthError::AuthenticationFailed(_) => "authentication_failed",
        }
    }

    /// Get the classification for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::TokenExpired
            | AuthError::InvalidToken(_)
            | AuthError::MalformedHeader(_)
            | AuthError::UnknownKey { .. }
            | AuthError::MissingSubject
            | AuthError::InvalidDevToken
            | AuthError::AuthenticationFailed(_) => ErrorClass::Unauthenticated,
            AuthError::InsufficientPermissions { .. } | AuthError::AnonymousAccessDenied => {
                ErrorClass::Forbidden
            }
            AuthError::KeySourceUnavailable(_) => ErrorClass::ServiceUnavailable,
        }
    }

    /// Build the response body for this error.
    pub fn body(&self) -> AuthErrorBody {
        AuthErrorBody {
            error: self.to_string(),
            error_code: self.code().to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => {
                AuthError::InvalidToken("Signature verification failed".into())
            }
            ErrorKind::InvalidAudience => {
                AuthError::InvalidToken("Token has invalid audience".into())
            }
            ErrorKind::InvalidIssuer => AuthError::InvalidToken("Token has invalid issuer".into()),
            ErrorKind::InvalidAlgorithm => {
                AuthError::InvalidToken("The specified alg is not allowed".into())
            }
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::InvalidToken(format!("Token is missing the \"{claim}\" claim"))
            }
            ErrorKind::InvalidToken
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_)
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm
            | ErrorKind::ImmatureSignature
            | ErrorKind::InvalidSubject => AuthError::InvalidToken(err.to_string()),
            _ => AuthError::AuthenticationFailed(err.to_string()),
        }
    }
}
