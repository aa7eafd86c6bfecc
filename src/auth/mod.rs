// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Local accounts with salted password hashes and self-issued session JWTs.
//!
//! ## Auth Flow
//!
//! 1. `POST /api/signup` hashes the password (PBKDF2-HMAC-SHA256) and stores
//!    the user keyed by email
//! 2. `POST /api/login` verifies the password and returns a session token
//! 3. Clients send `Authorization: Bearer <token>`; the server:
//!    - verifies the HMAC signature with the configured algorithm
//!    - rejects tokens past `exp` (no clock skew allowance)
//!    - for user endpoints, loads the user named by `sub`
//!
//! ## Security
//!
//! - Password verification is constant-time
//! - Every session failure renders the same 401 response
//! - The signing key is process-wide; rotating it invalidates all sessions

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod token;

pub use authenticator::Authenticator;
pub use claims::{AuthenticatedUser, SessionClaims};
pub use error::AuthError;
pub use extractor::{Auth, Session};
pub use password::{CredentialHasher, HashResult, HasherConfig};
pub use token::{TokenConfig, TokenError, TokenIssuer};
