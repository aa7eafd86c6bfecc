// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup and handed to
//! each component as a plain value. A missing secret or client credential is
//! a startup error, never a silent default.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8000` |
//! | `DATABASE_PATH` | redb file holding the user directory | `data/users.redb` |
//! | `JWT_SECRET_KEY` | HMAC secret for session tokens | Required |
//! | `JWT_ALGORITHM` | `HS256`, `HS384` or `HS512` | `HS256` |
//! | `ACCESS_TOKEN_EXPIRE_MINUTES` | Session token lifetime | `1440` |
//! | `PASSWORD_HASH_ITERATIONS` | PBKDF2 rounds (minimum 100000) | `100000` |
//! | `CLIENT_ID` | Spotify application client id | Required |
//! | `CLIENT_SECRET` | Spotify application client secret | Required |
//! | `REDIRECT_URI` | OAuth redirect registered with Spotify | Required |
//! | `SPOTIFY_AUTH_URL` | Authorization endpoint | `https://accounts.spotify.com/authorize` |
//! | `SPOTIFY_TOKEN_URL` | Token endpoint | `https://accounts.spotify.com/api/token` |
//! | `API_BASE_URL` | Web API base | `https://api.spotify.com/v1/` |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated origins, empty for permissive | empty |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use url::Url;

use crate::auth::password::{HasherConfig, MIN_ITERATIONS};
use crate::auth::token::{TokenConfig, DEFAULT_TOKEN_TTL_MINUTES};
use crate::logging::LogFormat;
use crate::providers::spotify::SpotifyConfig;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const JWT_SECRET_KEY_ENV: &str = "JWT_SECRET_KEY";
pub const JWT_ALGORITHM_ENV: &str = "JWT_ALGORITHM";
pub const ACCESS_TOKEN_EXPIRE_MINUTES_ENV: &str = "ACCESS_TOKEN_EXPIRE_MINUTES";
pub const PASSWORD_HASH_ITERATIONS_ENV: &str = "PASSWORD_HASH_ITERATIONS";
pub const CLIENT_ID_ENV: &str = "CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "CLIENT_SECRET";
pub const REDIRECT_URI_ENV: &str = "REDIRECT_URI";
pub const SPOTIFY_AUTH_URL_ENV: &str = "SPOTIFY_AUTH_URL";
pub const SPOTIFY_TOKEN_URL_ENV: &str = "SPOTIFY_TOKEN_URL";
pub const API_BASE_URL_ENV: &str = "API_BASE_URL";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DATABASE_PATH: &str = "data/users.redb";
const DEFAULT_SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1/";

/// Upstream request timeout. Fixed; not configurable.
pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Fully resolved process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub token: TokenConfig,
    pub hasher: HasherConfig,
    pub spotify: SpotifyConfig,
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty and whitespace-only values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: PORT_ENV,
                reason: format!("'{raw}' is not a port number"),
            })?,
            None => DEFAULT_PORT,
        };
        let database_path = PathBuf::from(
            get(DATABASE_PATH_ENV).unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
        );

        let secret = required(JWT_SECRET_KEY_ENV)?;
        let algorithm = match get(JWT_ALGORITHM_ENV) {
            Some(raw) => parse_hmac_algorithm(&raw)?,
            None => Algorithm::HS256,
        };
        let ttl_minutes = match get(ACCESS_TOKEN_EXPIRE_MINUTES_ENV) {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: ACCESS_TOKEN_EXPIRE_MINUTES_ENV,
                    reason: format!("'{raw}' is not a positive number of minutes"),
                })?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let iterations = match get(PASSWORD_HASH_ITERATIONS_ENV) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n >= MIN_ITERATIONS.get())
                .and_then(NonZeroU32::new)
                .ok_or_else(|| ConfigError::Invalid {
                    name: PASSWORD_HASH_ITERATIONS_ENV,
                    reason: format!("'{raw}' must be an integer >= {MIN_ITERATIONS}"),
                })?,
            None => MIN_ITERATIONS,
        };

        let spotify = SpotifyConfig {
            client_id: required(CLIENT_ID_ENV)?,
            client_secret: required(CLIENT_SECRET_ENV)?,
            redirect_uri: parse_url(REDIRECT_URI_ENV, &required(REDIRECT_URI_ENV)?)?,
            auth_url: parse_url(
                SPOTIFY_AUTH_URL_ENV,
                &get(SPOTIFY_AUTH_URL_ENV).unwrap_or_else(|| DEFAULT_SPOTIFY_AUTH_URL.to_string()),
            )?,
            token_url: parse_url(
                SPOTIFY_TOKEN_URL_ENV,
                &get(SPOTIFY_TOKEN_URL_ENV)
                    .unwrap_or_else(|| DEFAULT_SPOTIFY_TOKEN_URL.to_string()),
            )?,
            api_base_url: parse_url(
                API_BASE_URL_ENV,
                &get(API_BASE_URL_ENV).unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            )?,
            timeout: UPSTREAM_TIMEOUT,
        };

        let cors_allowed_origins = get(CORS_ALLOWED_ORIGINS_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                name: LOG_FORMAT_ENV,
                reason,
            })?,
            None => LogFormat::Pretty,
        };

        Ok(Self {
            host,
            port,
            database_path,
            token: TokenConfig {
                secret,
                algorithm,
                ttl: chrono::Duration::minutes(ttl_minutes),
            },
            hasher: HasherConfig { iterations },
            spotify,
            cors_allowed_origins,
            log_format,
        })
    }

    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_hmac_algorithm(raw: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(&raw.to_ascii_uppercase()).map_err(|_| {
        ConfigError::Invalid {
            name: JWT_ALGORITHM_ENV,
            reason: format!("unknown algorithm '{raw}'"),
        }
    })?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        _ => Err(ConfigError::Invalid {
            name: JWT_ALGORITHM_ENV,
            reason: format!("'{raw}' is not an HMAC algorithm"),
        }),
    }
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid {
        name,
        reason: format!("'{raw}' is not a valid URL: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (JWT_SECRET_KEY_ENV, "test-secret"),
            (CLIENT_ID_ENV, "client-id"),
            (CLIENT_SECRET_ENV, "client-secret"),
            (REDIRECT_URI_ENV, "http://localhost:5173/callback"),
        ])
    }

    fn load(env: &HashMap<&'static str, &'static str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|name| env.get(name).map(|v| v.to_string()))
    }

    #[test]
    fn defaults_are_applied() {
        let config = load(&base_env()).expect("config loads");
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.token.algorithm, Algorithm::HS256);
        assert_eq!(config.token.ttl, chrono::Duration::minutes(1440));
        assert_eq!(config.hasher.iterations, MIN_ITERATIONS);
        assert_eq!(config.spotify.timeout, Duration::from_secs(10));
        assert_eq!(
            config.spotify.api_base_url.as_str(),
            "https://api.spotify.com/v1/"
        );
        assert!(config.cors_allowed_origins.is_empty());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn missing_secret_fails_fast() {
        let mut env = base_env();
        env.remove(JWT_SECRET_KEY_ENV);
        assert!(matches!(
            load(&env),
            Err(ConfigError::Missing(JWT_SECRET_KEY_ENV))
        ));
    }

    #[test]
    fn blank_client_secret_counts_as_missing() {
        let mut env = base_env();
        env.insert(CLIENT_SECRET_ENV, "   ");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Missing(CLIENT_SECRET_ENV))
        ));
    }

    #[test]
    fn asymmetric_algorithm_is_rejected() {
        let mut env = base_env();
        env.insert(JWT_ALGORITHM_ENV, "RS256");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid {
                name: JWT_ALGORITHM_ENV,
                ..
            })
        ));
    }

    #[test]
    fn lowercase_hmac_algorithm_is_accepted() {
        let mut env = base_env();
        env.insert(JWT_ALGORITHM_ENV, "hs512");
        let config = load(&env).expect("config loads");
        assert_eq!(config.token.algorithm, Algorithm::HS512);
    }

    #[test]
    fn weak_iteration_count_is_rejected() {
        let mut env = base_env();
        env.insert(PASSWORD_HASH_ITERATIONS_ENV, "1000");
        assert!(load(&env).is_err());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let mut env = base_env();
        env.insert(
            CORS_ALLOWED_ORIGINS_ENV,
            "http://localhost:5173, https://savemyweekly.app ,",
        );
        let config = load(&env).expect("config loads");
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:5173", "https://savemyweekly.app"]
        );
    }

    #[test]
    fn malformed_redirect_uri_is_rejected() {
        let mut env = base_env();
        env.insert(REDIRECT_URI_ENV, "not a url");
        assert!(matches!(
            load(&env),
            Err(ConfigError::Invalid {
                name: REDIRECT_URI_ENV,
                ..
            })
        ));
    }
}
