// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `ToSchema` for OpenAPI documentation.
//!
//! ## Model Categories
//!
//! - **Accounts**: signup, login and the current-user profile
//! - **Spotify**: query parameters and responses for the broker routes

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::providers::spotify::TimeRange;

/// Maximum length of `name` and `lastname`.
pub const MAX_NAME_LEN: usize = 40;
/// Maximum length of `email`.
pub const MAX_EMAIL_LEN: usize = 150;

// =============================================================================
// Account Models
// =============================================================================

/// Request to create a new account.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SignupRequest {
    /// First name.
    pub name: String,
    /// Last name (may be empty).
    #[serde(default)]
    pub lastname: String,
    /// Email address, used as the login identifier.
    pub email: String,
    /// Plain-text password; only its salted hash is stored.
    pub password: String,
}

impl SignupRequest {
    /// Trim surrounding whitespace from the identity fields.
    ///
    /// The password is left untouched.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            lastname: self.lastname.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }

    /// Check field presence, shape and length limits.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(format!("name must be at most {MAX_NAME_LEN} characters"));
        }
        if self.lastname.chars().count() > MAX_NAME_LEN {
            return Err(format!("lastname must be at most {MAX_NAME_LEN} characters"));
        }
        if !is_plausible_email(&self.email) {
            return Err("email must be a valid email address".to_string());
        }
        if self.email.chars().count() > MAX_EMAIL_LEN {
            return Err(format!("email must be at most {MAX_EMAIL_LEN} characters"));
        }
        if self.password.is_empty() {
            return Err("password must not be empty".to_string());
        }
        Ok(())
    }
}

/// Exactly one `@`, non-empty local and domain parts, no whitespace.
fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

/// OAuth2 password-grant style login form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginForm {
    /// The account email.
    pub username: String,
    pub password: String,
}

impl LoginForm {
    /// Trim the username the same way signup trims the email.
    pub fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            password: self.password,
        }
    }
}

/// Issued session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Public profile of the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub lastname: String,
}

/// Plain confirmation message.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Spotify Models
// =============================================================================

/// Spotify authorize URL the client should navigate to.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUrlResponse {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct CodeQuery {
    /// Authorization code from the Spotify redirect.
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct TopItemsQuery {
    /// Spotify access token obtained from `/api/spotify/token`.
    pub spotify_token: String,
    /// One of `short_term`, `medium_term`, `long_term`.
    pub timespan: TimeRange,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SpotifyTokenQuery {
    /// Spotify access token obtained from `/api/spotify/token`.
    pub spotify_token: String,
}

/// Result of saving the weekly playlist.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeeklyPlaylistResponse {
    pub message: String,
    /// Spotify URL of the new playlist.
    pub url: Option<String>,
}
