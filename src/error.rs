// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::providers::spotify::SpotifyError;
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::AlreadyExists(_) => Self::conflict("Email already registered"),
            other => {
                tracing::error!(error = %other, "User directory failure");
                Self::internal("Internal storage error")
            }
        }
    }
}

impl From<SpotifyError> for ApiError {
    fn from(e: SpotifyError) -> Self {
        match &e {
            SpotifyError::PlaylistNotFound => Self::not_found(e.to_string()),
            SpotifyError::Upstream {
                status: Some(status),
                ..
            } if (400..500).contains(status) => {
                tracing::warn!(error = %e, "Spotify rejected the request");
                let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
                Self::new(status, format!("Spotify returned {status}"))
            }
            SpotifyError::Upstream { .. } | SpotifyError::MalformedResponse(_) => {
                tracing::error!(error = %e, "Spotify request failed");
                Self::bad_gateway("Spotify request failed")
            }
            SpotifyError::InvalidUrl(_) | SpotifyError::Client(_) => {
                tracing::error!(error = %e, "Spotify client misconfigured");
                Self::internal("Internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
