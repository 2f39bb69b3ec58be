// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Supabase Auth - bearer token verification for Rust services
//!
//! This crate verifies Supabase access tokens (legacy HS256 or asymmetric
//! keys published as a JWKS), maps them to an [`Identity`] and answers
//! role / anonymity checks. Transport is left to the caller.
//!
//! ## Modules
//!
//! - `auth` - Verifiers, JWKS cache, claim mapping, policy and the [`Authenticator`] facade
//! - `config` - Environment-driven configuration

pub mod auth;
pub mod config;

pub use auth::{
    require_any_role, require_not_anonymous, to_identity, Audience, AuthError, AuthErrorBody,
    Authenticator, ErrorClass, Guard, Identity, RawClaimSet,
};
pub use config::{AuthConfig, ConfigError, DevIdentity, VerificationMode};
