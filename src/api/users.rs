// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: signup, login and the current-user profile.

use axum::{
    extract::{rejection::FormRejection, rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use chrono::Utc;
use tracing::info;

use crate::{
    auth::{Auth, AuthError},
    error::ApiError,
    models::{LoginForm, MessageResponse, SignupRequest, TokenResponse, UserProfile},
    state::AppState,
    storage::{StorageError, StoredUser},
};

/// Create an account.
///
/// The password is stored only as a salted PBKDF2 digest.
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    tag = "Users",
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Invalid signup data"),
        (status = 409, description = "Email already registered"),
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let request = request.normalized();
    request.validate().map_err(ApiError::bad_request)?;

    let users = state.users.clone();
    let hasher = state.hasher.clone();
    let email = request.email.clone();

    // PBKDF2 and redb both block
    tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        // Skip the hashing cost for an obvious duplicate; insert re-checks
        if users.exists(&request.email)? {
            return Err(StorageError::AlreadyExists(request.email).into());
        }

        let hashed = hasher.hash(&request.password).map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ApiError::internal("Internal error")
        })?;

        users.insert(&StoredUser {
            email: request.email,
            name: request.name,
            lastname: request.lastname,
            password_hash: hashed.digest,
            salt: hashed.salt,
            created_at: Utc::now(),
        })?;
        Ok(())
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Signup task failed");
        ApiError::internal("Internal error")
    })?
    .inspect_err(|e| {
        if e.status == StatusCode::CONFLICT {
            info!(email = %email, "Signup rejected: email already registered");
        }
    })?;

    info!(email = %email, "User signed up");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User signed up successfully")),
    ))
}

/// Exchange email and password for a session token.
///
/// Accepts an `application/x-www-form-urlencoded` body with `username`
/// (the email) and `password`.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    tag = "Users",
    responses(
        (status = 200, description = "Session token issued", body = TokenResponse),
        (status = 401, description = "Incorrect password"),
        (status = 404, description = "User not found"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, Response> {
    let Form(form) = payload.map_err(|e| ApiError::bad_request(e.body_text()).into_response())?;
    let form = form.normalized();

    let authenticator = state.authenticator.clone();
    let username = form.username.clone();
    let outcome = tokio::task::spawn_blocking(move || authenticator.login(&form.username, &form.password))
        .await
        .map_err(|e| AuthError::InternalError(format!("login task failed: {e}")).into_response())?;

    match outcome {
        Ok(token) => {
            info!(email = %username, "User logged in");
            Ok(Json(TokenResponse::bearer(token)))
        }
        Err(e) => {
            if matches!(e, AuthError::UserNotFound | AuthError::InvalidCredentials) {
                info!(email = %username, reason = e.error_code(), "Login rejected");
            }
            Err(e.into_response())
        }
    }
}

/// Get the current authenticated user's profile.
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn me(Auth(user): Auth) -> Json<UserProfile> {
    Json(UserProfile {
        name: user.name,
        lastname: user.lastname,
    })
}
