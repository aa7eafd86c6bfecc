// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        AuthUrlResponse, LoginForm, MessageResponse, SignupRequest, TokenResponse, UserProfile,
        WeeklyPlaylistResponse,
    },
    providers::spotify::{SpotifyToken, TimeRange},
    state::AppState,
};

pub mod health;
pub mod spotify;
pub mod users;

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let api_routes = Router::new()
        .route("/signup", post(users::signup))
        .route("/login", post(users::login))
        .route("/users/me", get(users::me))
        .route("/spotify/user/auth", get(spotify::authorize_url))
        .route("/spotify/token", get(spotify::exchange_token))
        .route("/spotify/top/tracks", get(spotify::top_tracks))
        .route("/spotify/top/artists", get(spotify::top_artists))
        .route(
            "/spotify/save/weekly-playlist",
            get(spotify::save_weekly_playlist),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
}

/// Permissive CORS when no origins are configured, otherwise an allow-list.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        users::signup,
        users::login,
        users::me,
        spotify::authorize_url,
        spotify::exchange_token,
        spotify::top_tracks,
        spotify::top_artists,
        spotify::save_weekly_playlist,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            SignupRequest,
            LoginForm,
            TokenResponse,
            UserProfile,
            MessageResponse,
            AuthUrlResponse,
            SpotifyToken,
            TimeRange,
            WeeklyPlaylistResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Users", description = "Signup, login and profile"),
        (name = "Spotify", description = "Session-gated Spotify Web API access"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::TestContext;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wiremock::matchers::{any, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn send(ctx: &TestContext, request: Request<Body>) -> Response {
        router(ctx.state.clone(), &[])
            .oneshot(request)
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn signup_request(body: Value) -> Request<Body> {
        Request::post("/api/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn login_request(username: &str, password: &str) -> Request<Body> {
        let form: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password)
            .finish();
        Request::post("/api/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap()
    }

    fn get_with_bearer(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn ada() -> Value {
        json!({
            "name": "Ada",
            "lastname": "Lovelace",
            "email": "ada@example.com",
            "password": "analytical"
        })
    }

    #[tokio::test]
    async fn signup_login_and_profile_round_trip() {
        let ctx = TestContext::new().await;

        let response = send(&ctx, signup_request(ada())).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            json_body(response).await["message"],
            "User signed up successfully"
        );

        let response = send(&ctx, login_request("ada@example.com", "analytical")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap().to_string();

        let response = send(&ctx, get_with_bearer("/api/users/me", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "name": "Ada", "lastname": "Lovelace" })
        );
    }

    #[tokio::test]
    async fn stored_password_is_salted_hash() {
        let ctx = TestContext::new().await;
        send(&ctx, signup_request(ada())).await;

        let stored = ctx
            .state
            .users
            .get_by_email("ada@example.com")
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, "analytical");
        assert_eq!(stored.password_hash.len(), 64);
        assert_eq!(stored.salt.len(), 32);
        assert!(ctx
            .state
            .hasher
            .verify("analytical", &stored.password_hash, &stored.salt));
    }

    #[tokio::test]
    async fn duplicate_signup_is_conflict_and_keeps_original() {
        let ctx = TestContext::new().await;
        send(&ctx, signup_request(ada())).await;

        let mut again = ada();
        again["name"] = json!("Impostor");
        again["password"] = json!("other");
        let response = send(&ctx, signup_request(again)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let stored = ctx
            .state
            .users
            .get_by_email("ada@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "Ada");
        assert_eq!(ctx.state.users.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_signup_is_bad_request() {
        let ctx = TestContext::new().await;
        let mut body = ada();
        body["email"] = json!("not-an-email");

        let response = send(&ctx, signup_request(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
        assert_eq!(ctx.state.users.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn login_distinguishes_unknown_user_and_bad_password() {
        let ctx = TestContext::new().await;
        ctx.register("ada@example.com", "analytical").await;

        let response = send(&ctx, login_request("nobody@example.com", "analytical")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&ctx, login_request("ada@example.com", "wrong")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_accepts_email_as_typed_at_signup() {
        let ctx = TestContext::new().await;
        let mut body = ada();
        body["email"] = json!(" ada@example.com");

        let response = send(&ctx, signup_request(body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = send(&ctx, login_request(" ada@example.com", "analytical")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let response = send(&ctx, login_request("ada@example.com", "analytical")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn profile_rejections_share_one_body() {
        let ctx = TestContext::new().await;
        let expired = ctx
            .state
            .tokens
            .issue_with_ttl("ada@example.com", chrono::Duration::seconds(-1))
            .unwrap();
        let unknown = ctx.token_for("ghost@example.com");

        let missing = send(&ctx, get_with_bearer("/api/users/me", None)).await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        let expected = json_body(missing).await;
        assert_eq!(expected["error"], "Could not validate credentials");

        for token in [expired.as_str(), unknown.as_str(), "garbage"] {
            let response = send(&ctx, get_with_bearer("/api/users/me", Some(token))).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(json_body(response).await, expected);
        }
    }

    #[tokio::test]
    async fn spotify_routes_reject_without_calling_upstream() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let ctx = TestContext::with_spotify(&server.uri()).await;

        for uri in [
            "/api/spotify/user/auth",
            "/api/spotify/token?code=abc",
            "/api/spotify/top/tracks?spotify_token=x&timespan=short_term",
            "/api/spotify/top/artists?spotify_token=x&timespan=long_term",
            "/api/spotify/save/weekly-playlist?spotify_token=x",
        ] {
            let response = send(&ctx, get_with_bearer(uri, None)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");

            let response = send(&ctx, get_with_bearer(uri, Some("tampered.token.value"))).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn authorize_url_contains_oauth_parameters() {
        let ctx = TestContext::new().await;
        let token = ctx.token_for("ada@example.com");

        let response = send(&ctx, get_with_bearer("/api/spotify/user/auth", Some(&token))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let url = url::Url::parse(body["url"].as_str().unwrap()).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "test-client");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["redirect_uri"], "http://localhost:5173/callback");
        assert!(pairs["scope"].contains("user-top-read"));
        assert_eq!(pairs["state"].len(), 32);
    }

    #[tokio::test]
    async fn token_exchange_returns_spotify_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "BQD-access",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "AQD-refresh",
                "scope": "user-top-read"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let ctx = TestContext::with_spotify(&server.uri()).await;
        let token = ctx.token_for("ada@example.com");

        let response = send(
            &ctx,
            get_with_bearer("/api/spotify/token?code=AQ-code", Some(&token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["access_token"], "BQD-access");
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["expires_in"], 3600);
        assert_eq!(body["refresh_token"], "AQD-refresh");
        assert_eq!(body["scope"], "user-top-read");
    }

    #[tokio::test]
    async fn invalid_timespan_is_bad_request() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let ctx = TestContext::with_spotify(&server.uri()).await;
        let token = ctx.token_for("ada@example.com");

        let response = send(
            &ctx,
            get_with_bearer(
                "/api/spotify/top/tracks?spotify_token=x&timespan=forever",
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upstream_failures_map_to_relay_or_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/top/tracks"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/me/top/artists"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let ctx = TestContext::with_spotify(&server.uri()).await;
        let token = ctx.token_for("ada@example.com");

        let response = send(
            &ctx,
            get_with_bearer(
                "/api/spotify/top/tracks?spotify_token=stale&timespan=medium_term",
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &ctx,
            get_with_bearer(
                "/api/spotify/top/artists?spotify_token=x&timespan=medium_term",
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn missing_discover_weekly_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "user-1" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/users/user-1/playlists"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;
        let ctx = TestContext::with_spotify(&server.uri()).await;
        let token = ctx.token_for("ada@example.com");

        let response = send(
            &ctx,
            get_with_bearer(
                "/api/spotify/save/weekly-playlist?spotify_token=x",
                Some(&token),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let doc = ApiDoc::openapi();
        for route in [
            "/api/signup",
            "/api/login",
            "/api/users/me",
            "/api/spotify/user/auth",
            "/api/spotify/token",
            "/api/spotify/top/tracks",
            "/api/spotify/top/artists",
            "/api/spotify/save/weekly-playlist",
        ] {
            assert!(doc.paths.paths.contains_key(route), "{route}");
        }
    }
}
