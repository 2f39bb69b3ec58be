// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorization guards over an authenticated [`Identity`].
//!
//! Guards never look at the token again; they run after
//! [`Authenticator::authenticate`](super::Authenticator::authenticate) and
//! can be combined freely:
//!
//! ```rust,ignore
//! let identity = authenticator.authenticate(token).await?;
//! require_not_anonymous(&identity)?;
//! require_any_role(&identity, &["admin", "editor"])?;
//! ```

use super::{AuthError, Identity};

/// A guard expressed as data, for handlers or middleware that carry their
/// requirements in a route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The identity's role must equal one of these exactly
    AnyRole(Vec<String>),
    /// The identity must not be anonymous
    NotAnonymous,
}

impl Guard {
    /// Build an [`AnyRole`](Guard::AnyRole) guard.
    pub fn any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Guard::AnyRole(roles.into_iter().map(Into::into).collect())
    }

    /// Apply this guard to an identity.
    pub fn check(&self, identity: &Identity) -> Result<(), AuthError> {
        match self {
            Guard::AnyRole(roles) => require_any_role(identity, roles.as_slice()),
            Guard::NotAnonymous => require_not_anonymous(identity),
        }
    }
}

/// Pass if the identity's role equals one of `allowed_roles`.
///
/// Comparison is exact and case-sensitive; an identity without a role never
/// passes.
pub fn require_any_role<S: AsRef<str>>(
    identity: &Identity,
    allowed_roles: &[S],
) -> Result<(), AuthError> {
    if allowed_roles
        .iter()
        .any(|role| identity.has_role(role.as_ref()))
    {
        return Ok(());
    }

    Err(AuthError::InsufficientPermissions {
        required: allowed_roles
            .iter()
            .map(|role| role.as_ref().to_string())
            .collect(),
        actual: identity.role.clone(),
    })
}

/// Reject anonymous identities.
pub fn require_not_anonymous(identity: &Identity) -> Result<(), AuthError> {
    if identity.is_anonymous {
        return Err(AuthError::AnonymousAccessDenied);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn identity(role: Option<&str>, is_anonymous: bool) -> Identity {
        Identity {
            user_id: "user_123".to_string(),
            role: role.map(str::to_string),
            email: None,
            expires_at: Utc::now(),
            audience: None,
            issuer: None,
            is_anonymous,
        }
    }

    #[test]
    fn any_role_passes_on_exact_match() {
        let admin = identity(Some("admin"), false);
        assert!(require_any_role(&admin, &["admin"]).is_ok());
        assert!(require_any_role(&admin, &["editor", "admin"]).is_ok());
    }

    #[test]
    fn any_role_is_case_sensitive_and_not_substring() {
        let admin = identity(Some("admin"), false);
        assert!(require_any_role(&admin, &["Admin"]).is_err());
        assert!(require_any_role(&admin, &["administrator"]).is_err());
        assert!(require_any_role(&admin, &["adm"]).is_err());
    }

    #[test]
    fn any_role_reports_required_and_actual() {
        let editor = identity(Some("editor"), false);
        let err = require_any_role(&editor, &["admin"]).unwrap_err();
        assert_eq!(
            err,
            AuthError::InsufficientPermissions {
                required: vec!["admin".to_string()],
                actual: Some("editor".to_string()),
            }
        );
    }

    #[test]
    fn missing_role_never_passes() {
        let nobody = identity(None, false);
        assert!(require_any_role(&nobody, &["admin"]).is_err());
        assert!(require_any_role::<&str>(&nobody, &[]).is_err());
    }

    #[test]
    fn not_anonymous_rejects_only_anonymous() {
        assert_eq!(
            require_not_anonymous(&identity(None, true)),
            Err(AuthError::AnonymousAccessDenied)
        );
        assert!(require_not_anonymous(&identity(None, false)).is_ok());
    }

    #[test]
    fn guards_dispatch_to_predicates() {
        let anon_admin = identity(Some("admin"), true);
        assert!(Guard::any_role(["admin"]).check(&anon_admin).is_ok());
        assert_eq!(
            Guard::NotAnonymous.check(&anon_admin),
            Err(AuthError::AnonymousAccessDenied)
        );
    }
}
