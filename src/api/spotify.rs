// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session-gated Spotify endpoints.
//!
//! Every handler takes [`Session`] as its first extractor, so a request
//! without a valid session token is rejected before any Spotify call.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use chrono::Local;
use serde_json::Value;
use tracing::debug;

use crate::{
    auth::Session,
    error::ApiError,
    models::{AuthUrlResponse, CodeQuery, SpotifyTokenQuery, TopItemsQuery, WeeklyPlaylistResponse},
    providers::spotify::{generate_state, SpotifyToken, TopItemKind, DEFAULT_SCOPES},
    state::AppState,
};

fn query<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    params
        .map(|Query(inner)| inner)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// Spotify authorize URL for the OAuth2 authorization-code flow.
#[utoipa::path(
    get,
    path = "/api/spotify/user/auth",
    tag = "Spotify",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Authorize URL", body = AuthUrlResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn authorize_url(
    Session(claims): Session,
    State(state): State<AppState>,
) -> Result<Json<AuthUrlResponse>, ApiError> {
    let oauth_state = generate_state()?;
    let url = state
        .spotify
        .build_authorization_url(&oauth_state, DEFAULT_SCOPES);
    debug!(subject = %claims.sub, "Issued Spotify authorize URL");

    Ok(Json(AuthUrlResponse {
        url: url.to_string(),
    }))
}

/// Exchange the authorization code from the Spotify redirect for tokens.
#[utoipa::path(
    get,
    path = "/api/spotify/token",
    params(CodeQuery),
    tag = "Spotify",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Spotify token set", body = SpotifyToken),
        (status = 400, description = "Missing code"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 502, description = "Spotify request failed"),
    )
)]
pub async fn exchange_token(
    Session(_claims): Session,
    State(state): State<AppState>,
    params: Result<Query<CodeQuery>, QueryRejection>,
) -> Result<Json<SpotifyToken>, ApiError> {
    let params = query(params)?;
    let token = state.spotify.exchange_code(&params.code).await?;
    Ok(Json(token))
}

/// The user's top tracks over the requested time range.
#[utoipa::path(
    get,
    path = "/api/spotify/top/tracks",
    params(TopItemsQuery),
    tag = "Spotify",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Spotify top tracks, as returned by Spotify", body = Object),
        (status = 400, description = "Missing token or invalid timespan"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 502, description = "Spotify request failed"),
    )
)]
pub async fn top_tracks(
    Session(_claims): Session,
    State(state): State<AppState>,
    params: Result<Query<TopItemsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    top_items(&state, TopItemKind::Tracks, query(params)?).await
}

/// The user's top artists over the requested time range.
#[utoipa::path(
    get,
    path = "/api/spotify/top/artists",
    params(TopItemsQuery),
    tag = "Spotify",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Spotify top artists, as returned by Spotify", body = Object),
        (status = 400, description = "Missing token or invalid timespan"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 502, description = "Spotify request failed"),
    )
)]
pub async fn top_artists(
    Session(_claims): Session,
    State(state): State<AppState>,
    params: Result<Query<TopItemsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    top_items(&state, TopItemKind::Artists, query(params)?).await
}

async fn top_items(
    state: &AppState,
    kind: TopItemKind,
    params: TopItemsQuery,
) -> Result<Json<Value>, ApiError> {
    let body = state
        .spotify
        .top_items(kind, &params.spotify_token, params.timespan)
        .await?;
    Ok(Json(body))
}

/// Copy this week's Discover Weekly into a new dated playlist.
#[utoipa::path(
    get,
    path = "/api/spotify/save/weekly-playlist",
    params(SpotifyTokenQuery),
    tag = "Spotify",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Playlist saved", body = WeeklyPlaylistResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 404, description = "No Discover Weekly playlist"),
        (status = 502, description = "Spotify request failed"),
    )
)]
pub async fn save_weekly_playlist(
    Session(claims): Session,
    State(state): State<AppState>,
    params: Result<Query<SpotifyTokenQuery>, QueryRejection>,
) -> Result<Json<WeeklyPlaylistResponse>, ApiError> {
    let params = query(params)?;
    let today = Local::now().date_naive();
    let saved = state
        .spotify
        .save_weekly_playlist(&params.spotify_token, today)
        .await?;
    debug!(subject = %claims.sub, playlist = %saved.name, "Saved weekly playlist");

    Ok(Json(WeeklyPlaylistResponse {
        message: "Weekly playlist saved.".to_string(),
        url: saved.url,
    }))
}
