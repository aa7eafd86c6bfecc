// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login and session resolution.
//!
//! The authenticator composes the user directory, credential hasher and token
//! issuer. All three are handed in at construction; nothing is looked up
//! ambiently. Its methods block (PBKDF2 and redb), so async callers should
//! run them on the blocking pool.

use std::sync::Arc;

use super::claims::SessionClaims;
use super::password::CredentialHasher;
use super::token::TokenIssuer;
use super::AuthError;
use crate::storage::{StoredUser, UserDirectory};

pub struct Authenticator {
    users: Arc<UserDirectory>,
    hasher: Arc<CredentialHasher>,
    tokens: Arc<TokenIssuer>,
}

impl Authenticator {
    pub fn new(
        users: Arc<UserDirectory>,
        hasher: Arc<CredentialHasher>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            users,
            hasher,
            tokens,
        }
    }

    /// Check `password` for the user registered under `identifier`.
    ///
    /// Returns `UserNotFound` when no such user exists and
    /// `InvalidCredentials` when the password does not match.
    pub fn authenticate(&self, identifier: &str, password: &str) -> Result<StoredUser, AuthError> {
        let user = self
            .users
            .get_by_email(identifier)?
            .ok_or(AuthError::UserNotFound)?;

        if self
            .hasher
            .verify(password, &user.password_hash, &user.salt)
        {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Authenticate and issue a session token for the user.
    pub fn login(&self, identifier: &str, password: &str) -> Result<String, AuthError> {
        let user = self.authenticate(identifier, password)?;
        Ok(self.tokens.issue(&user.email)?)
    }

    /// Validate a session token without touching the user directory.
    pub fn validate_session(&self, token: &str) -> Result<SessionClaims, AuthError> {
        Ok(self.tokens.validate(token)?)
    }

    /// Resolve a session token to the user it was issued for.
    ///
    /// Fails with `UnknownSubject` if the user no longer exists.
    pub fn current_principal(&self, token: &str) -> Result<(StoredUser, SessionClaims), AuthError> {
        let claims = self.validate_session(token)?;
        let user = self
            .users
            .get_by_email(&claims.sub)?
            .ok_or(AuthError::UnknownSubject)?;
        Ok((user, claims))
    }
}
