// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use savemyweekly_server::{api::router, config::AppConfig, logging, state::AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; real environment variables still apply
    let _ = dotenvy::dotenv();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.log_format);

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize application state");
            return ExitCode::FAILURE;
        }
    };
    let app = router(state, &config.cors_allowed_origins);

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    info!(
        %addr,
        database = %config.database_path.display(),
        token_algorithm = ?config.token.algorithm,
        "Save My Weekly server listening (docs at /docs)"
    );

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
