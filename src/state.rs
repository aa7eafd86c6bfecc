// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{Authenticator, CredentialHasher, TokenIssuer};
use crate::config::AppConfig;
use crate::providers::spotify::{SpotifyClient, SpotifyError};
use crate::storage::{StorageError, UserDirectory};

/// Failure while assembling [`AppState`] at startup.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to open user directory: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to build Spotify client: {0}")]
    Spotify(#[from] SpotifyError),
}

/// Shared handler state. Immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserDirectory>,
    pub hasher: Arc<CredentialHasher>,
    pub tokens: Arc<TokenIssuer>,
    pub authenticator: Arc<Authenticator>,
    pub spotify: Arc<SpotifyClient>,
}

impl AppState {
    pub fn new(
        users: UserDirectory,
        hasher: CredentialHasher,
        tokens: TokenIssuer,
        spotify: SpotifyClient,
    ) -> Self {
        let users = Arc::new(users);
        let hasher = Arc::new(hasher);
        let tokens = Arc::new(tokens);
        let authenticator = Arc::new(Authenticator::new(
            users.clone(),
            hasher.clone(),
            tokens.clone(),
        ));

        Self {
            users,
            hasher,
            tokens,
            authenticator,
            spotify: Arc::new(spotify),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        let users = UserDirectory::open(&config.database_path)?;
        let spotify = SpotifyClient::new(config.spotify.clone())?;
        Ok(Self::new(
            users,
            CredentialHasher::new(config.hasher),
            TokenIssuer::new(&config.token),
            spotify,
        ))
    }
}
