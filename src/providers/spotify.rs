// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Spotify accounts service and Web API client.
//!
//! Covers the OAuth2 authorization-code flow (authorize URL and code
//! exchange) and the proxied Web API calls. The caller's Spotify access token
//! is forwarded on each call and never stored.

use std::fmt;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use chrono::{NaiveDate, Weekday};
use reqwest::{Client, Response};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;
use utoipa::ToSchema;

/// Scopes requested on the authorize redirect.
pub const DEFAULT_SCOPES: &[&str] = &[
    "playlist-read-private",
    "playlist-read-collaborative",
    "playlist-modify-private",
    "playlist-modify-public",
    "user-top-read",
];

/// Name of the Spotify-curated playlist copied by the weekly save.
pub const DISCOVER_WEEKLY: &str = "Discover Weekly";

const WEEKLY_DESCRIPTION: &str = "Weekly playlist generated by Save My Weekly. Enjoy!";
const TOP_ITEMS_LIMIT: u32 = 20;
const PLAYLIST_PAGE_LIMIT: u32 = 50;
/// Spotify accepts at most this many URIs per add-tracks call.
const ADD_TRACKS_BATCH: usize = 100;
const STATE_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    /// Transport failure, timeout or non-2xx status from Spotify.
    #[error("Spotify request failed: {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Spotify response was invalid: {0}")]
    MalformedResponse(String),

    #[error("No 'Discover Weekly' playlist found for this user")]
    PlaylistNotFound,

    #[error("invalid Spotify URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Spotify client error: {0}")]
    Client(String),
}

impl SpotifyError {
    /// Upstream HTTP status, when Spotify answered at all.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            SpotifyError::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

/// Spotify application credentials and endpoints.
#[derive(Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
    pub auth_url: Url,
    pub token_url: Url,
    pub api_base_url: Url,
    pub timeout: Duration,
}

impl fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri.as_str())
            .field("auth_url", &self.auth_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field("api_base_url", &self.api_base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
impl SpotifyConfig {
    /// Every endpoint rooted at `base`, as served by a stub server.
    pub(crate) fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: Url::parse("http://localhost:5173/callback").unwrap(),
            auth_url: Url::parse(&format!("{base}/authorize")).unwrap(),
            token_url: Url::parse(&format!("{base}/api/token")).unwrap(),
            api_base_url: Url::parse(&format!("{base}/v1/")).unwrap(),
            timeout: Duration::from_secs(2),
        }
    }
}

/// Token set returned by the authorization-code exchange.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct SpotifyToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: u64,
    /// Spotify may omit this on some grants
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Space-separated scopes actually granted
    pub scope: String,
}

impl fmt::Debug for SpotifyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopItemKind {
    Tracks,
    Artists,
}

impl TopItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TopItemKind::Tracks => "tracks",
            TopItemKind::Artists => "artists",
        }
    }
}

/// Window over which Spotify computes top items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    /// About four weeks
    ShortTerm,
    /// About six months
    MediumTerm,
    /// About a year
    LongTerm,
}

impl TimeRange {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

/// Playlist created by the weekly save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPlaylist {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub track_count: usize,
}

#[derive(Deserialize)]
struct SpotifyUser {
    id: String,
}

#[derive(Deserialize)]
struct Page<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct PlaylistSummary {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct PlaylistItem {
    track: Option<TrackRef>,
}

#[derive(Deserialize)]
struct TrackRef {
    uri: Option<String>,
}

#[derive(Deserialize)]
struct CreatedPlaylist {
    id: String,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

/// Random opaque value for the OAuth `state` parameter (32 hex chars).
pub fn generate_state() -> Result<String, SpotifyError> {
    let mut bytes = [0u8; STATE_LEN];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| SpotifyError::Client("system RNG failure".to_string()))?;
    Ok(hex::encode(bytes))
}

/// Name of the copy saved for the Monday-to-Sunday week containing `today`.
pub fn weekly_playlist_name(today: NaiveDate) -> String {
    let week = today.week(Weekday::Mon);
    format!(
        "{DISCOVER_WEEKLY} - {} to {}",
        week.first_day().format("%Y-%m-%d"),
        week.last_day().format("%Y-%m-%d")
    )
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    config: SpotifyConfig,
    http: Client,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> Result<Self, SpotifyError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SpotifyError::Client(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// URL the browser is sent to so the user can grant access.
    pub fn build_authorization_url(&self, state: &str, scopes: &[&str]) -> Url {
        let mut url = self.config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.config.redirect_uri.as_str())
            .append_pair("scope", &scopes.join(" "))
            .append_pair("state", state)
            .append_pair("show_dialog", "true");
        url
    }

    /// Trade an authorization code for a token set.
    pub async fn exchange_code(&self, code: &str) -> Result<SpotifyToken, SpotifyError> {
        let credentials = format!("{}:{}", self.config.client_id, self.config.client_secret);
        let basic = Base64::encode_string(credentials.as_bytes());
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url.clone())
            .header("Authorization", format!("Basic {basic}"))
            .form(&form)
            .send()
            .await
            .map_err(|e| transport_error("POST token", e))?;

        let token: SpotifyToken = read_json("POST token", response).await?;
        if token.access_token.trim().is_empty() {
            return Err(SpotifyError::MalformedResponse(
                "token response did not include access_token".to_string(),
            ));
        }
        Ok(token)
    }

    /// The user's top tracks or artists, relayed as returned by Spotify.
    pub async fn top_items(
        &self,
        kind: TopItemKind,
        access_token: &str,
        time_range: TimeRange,
    ) -> Result<Value, SpotifyError> {
        let mut url = self.api_url(&["me", "top", kind.as_str()])?;
        url.query_pairs_mut()
            .append_pair("time_range", time_range.as_str())
            .append_pair("limit", &TOP_ITEMS_LIMIT.to_string());

        self.get_json(url, access_token).await
    }

    /// Copy this week's Discover Weekly into a new dated playlist.
    ///
    /// Not transactional: if adding tracks fails the new playlist is left in
    /// place on Spotify.
    pub async fn save_weekly_playlist(
        &self,
        access_token: &str,
        today: NaiveDate,
    ) -> Result<SavedPlaylist, SpotifyError> {
        let me: SpotifyUser = self.get_json(self.api_url(&["me"])?, access_token).await?;

        let mut url = self.api_url(&["users", me.id.as_str(), "playlists"])?;
        url.query_pairs_mut()
            .append_pair("limit", &PLAYLIST_PAGE_LIMIT.to_string());
        let playlists: Page<PlaylistSummary> = self.get_json(url, access_token).await?;
        let source = playlists
            .items
            .into_iter()
            .find(|p| p.name == DISCOVER_WEEKLY)
            .ok_or(SpotifyError::PlaylistNotFound)?;

        let tracks: Page<PlaylistItem> = self
            .get_json(
                self.api_url(&["playlists", source.id.as_str(), "tracks"])?,
                access_token,
            )
            .await?;
        let uris: Vec<String> = tracks
            .items
            .into_iter()
            .filter_map(|item| item.track.and_then(|t| t.uri))
            .collect();

        let name = weekly_playlist_name(today);
        let created: CreatedPlaylist = self
            .post_json(
                self.api_url(&["users", me.id.as_str(), "playlists"])?,
                access_token,
                &json!({
                    "name": name,
                    "public": true,
                    "collaborative": false,
                    "description": WEEKLY_DESCRIPTION,
                }),
            )
            .await?;

        let add_url = self.api_url(&["playlists", created.id.as_str(), "tracks"])?;
        for batch in uris.chunks(ADD_TRACKS_BATCH) {
            let added: Result<Value, _> = self
                .post_json(add_url.clone(), access_token, &json!({ "uris": batch }))
                .await;
            if let Err(e) = added {
                warn!(
                    playlist_id = %created.id,
                    error = %e,
                    "Weekly playlist created but adding tracks failed"
                );
                return Err(e);
            }
        }

        info!(
            playlist_id = %created.id,
            tracks = uris.len(),
            "Weekly playlist saved"
        );

        Ok(SavedPlaylist {
            id: created.id,
            name,
            url: created.external_urls.spotify,
            track_count: uris.len(),
        })
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, SpotifyError> {
        let mut url = self.config.api_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SpotifyError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        access_token: &str,
    ) -> Result<T, SpotifyError> {
        let what = format!("GET {}", url.path());
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| transport_error(&what, e))?;
        read_json(&what, response).await
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        access_token: &str,
        payload: &Value,
    ) -> Result<T, SpotifyError> {
        let what = format!("POST {}", url.path());
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(&what, e))?;
        read_json(&what, response).await
    }
}

fn transport_error(what: &str, e: reqwest::Error) -> SpotifyError {
    SpotifyError::Upstream {
        status: None,
        message: format!("{what} failed: {e}"),
    }
}

async fn read_json<T: DeserializeOwned>(what: &str, response: Response) -> Result<T, SpotifyError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SpotifyError::Upstream {
            status: Some(status.as_u16()),
            message: format!("{what} returned {status}: {body}"),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| transport_error(what, e))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SpotifyError::MalformedResponse(format!("{what} invalid JSON: {e}")))
}
