// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for session-token authentication.
//!
//! Use `Auth` when the handler needs the user record, or `Session` when a
//! valid token is enough:
//!
//! ```rust,ignore
//! async fn me(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//!
//! async fn proxied(Session(claims): Session, Query(q): Query<Params>) -> impl IntoResponse {
//!     // rejected with 401 before any other extractor runs
//! }
//! ```
//!
//! Both reject with [`AuthError`], which renders a generic 401. Put them
//! first in the argument list so a missing token short-circuits the request
//! before any query parsing or upstream call.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedUser, SessionClaims};
use crate::state::AppState;

/// Extractor for the authenticated user behind a session token.
///
/// Validates the token and loads the user from the directory. A token whose
/// subject has since disappeared is rejected.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?.to_string();
        let authenticator = state.authenticator.clone();

        // The directory read blocks
        let (user, claims) =
            tokio::task::spawn_blocking(move || authenticator.current_principal(&token))
                .await
                .map_err(|e| AuthError::InternalError(format!("principal lookup failed: {e}")))??;

        Ok(Auth(AuthenticatedUser::new(user, &claims)))
    }
}

/// Extractor for a valid session token, without a directory lookup.
pub struct Session(pub SessionClaims);

impl FromRequestParts<AppState> for Session {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.authenticator.validate_session(token)?;
        Ok(Session(claims))
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme name is matched case-insensitively.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}
