// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::token::TokenError;
use crate::storage::StorageError;

/// Body used for every session-token failure, whatever the cause.
pub const UNAUTHENTICATED_MESSAGE: &str = "Could not validate credentials";

/// Authentication error type.
///
/// Session-token failures (missing header, bad signature, expiry, unknown
/// subject) all render the same 401 body; the variant is only visible in
/// server logs through [`AuthError::error_code`].
#[derive(Debug)]
pub enum AuthError {
    /// No authorization header present
    MissingAuthHeader,
    /// Invalid authorization header format
    InvalidAuthHeader,
    /// Token is malformed or its signature does not verify
    InvalidToken,
    /// Token has expired
    TokenExpired,
    /// Token is valid but its subject is no longer registered
    UnknownSubject,
    /// Login identifier is not registered
    UserNotFound,
    /// Login password does not match
    InvalidCredentials,
    /// User directory failure
    Storage(String),
    /// Internal error
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::UnknownSubject => "unknown_subject",
            AuthError::UserNotFound => "user_not_found",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::Storage(_) => "storage_error",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::UnknownSubject
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::Storage(_) | AuthError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this is a session-token failure (rendered generically).
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            AuthError::MissingAuthHeader
                | AuthError::InvalidAuthHeader
                | AuthError::InvalidToken
                | AuthError::TokenExpired
                | AuthError::UnknownSubject
        )
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::UnknownSubject => write!(f, "{UNAUTHENTICATED_MESSAGE}"),
            AuthError::UserNotFound => write!(f, "User not found"),
            AuthError::InvalidCredentials => write!(f, "Incorrect password"),
            AuthError::Storage(_) | AuthError::InternalError(_) => {
                write!(f, "Internal authentication error")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl From<TokenError> for AuthError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid => AuthError::InvalidToken,
            TokenError::Encoding(msg) => AuthError::InternalError(msg),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        AuthError::Storage(e.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AuthError::Storage(detail) | AuthError::InternalError(detail) => {
                tracing::error!(error_code = self.error_code(), %detail, "Authentication failed");
            }
            _ => tracing::debug!(error_code = self.error_code(), "Authentication rejected"),
        }

        let body = Json(AuthErrorBody {
            error: self.to_string(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
