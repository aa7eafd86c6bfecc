// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session claims and authenticated user representation.

use serde::{Deserialize, Serialize};

use crate::storage::StoredUser;

/// Claims carried by a session token.
///
/// A token for subject S asserts only that S authenticated successfully at
/// `iat`; it carries no scopes or roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject (the user's email)
    pub sub: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiration (seconds since epoch)
    pub exp: i64,
}

/// Authenticated user information resolved from a session token.
///
/// This is the type handlers receive from the [`super::Auth`] extractor.
/// It is built from the stored record but never carries the password hash
/// or salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub email: String,
    pub name: String,
    pub lastname: String,
    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn new(user: StoredUser, claims: &SessionClaims) -> Self {
        Self {
            email: user.email,
            name: user.name,
            lastname: user.lastname,
            expires_at: claims.exp,
        }
    }
}
