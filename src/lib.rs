// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Save My Weekly - Account & Spotify Broker Service
//!
//! Local signup/login with salted password hashes and self-issued session
//! JWTs, plus session-gated access to the Spotify Web API through the OAuth2
//! authorization-code flow.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Password hashing, session tokens and extractors
//! - `config` - Environment configuration
//! - `providers` - Spotify accounts and Web API client
//! - `storage` - User directory (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;
