// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Supabase bearer-token verification and authorization checks.
//!
//! ## Auth Flow
//!
//! 1. Client authenticates with Supabase Auth
//! 2. Client sends `Authorization: Bearer <access token>`
//! 3. Service:
//!    - Verifies the token (HS256 legacy secret, or JWKS keys by `kid`/`alg`)
//!    - Checks `exp` with leeway, plus `aud`/`iss` when configured
//!    - Extracts:
//!      - `sub` → canonical `user_id`
//!      - `role`, `email`, `is_anonymous`
//! 4. Handlers apply role / anonymity guards to the resulting [`Identity`]
//!
//! ## Security
//!
//! - The verification algorithm comes from configuration or the JWKS, never
//!   from the token alone
//! - JWKS is cached with a TTL; an expired document is never served
//! - The development bypass replaces verification entirely; keep it off
//!   outside local development

pub mod authenticator;
pub mod claims;
pub mod dev;
pub mod error;
pub mod jwks;
pub mod policy;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use authenticator::Authenticator;
pub use claims::{to_identity, Audience, Identity, RawClaimSet};
pub use dev::DevBypass;
pub use error::{AuthError, AuthErrorBody, ErrorClass};
pub use jwks::{resolve, Jwk, JwksDocument, KeyCache};
pub use policy::{require_any_role, require_not_anonymous, Guard};
pub use verifier::{HmacVerifier, JwksVerifier, Verifier};
