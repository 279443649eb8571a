// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod categories;
pub mod comments;
pub mod posts;
pub mod users;

use crate::config::Config;
use crate::middleware::auth::require_auth;
use crate::AppState;
use axum::http::{header, HeaderMap, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Payload for responses that carry no data (`"data": {}`).
#[derive(Debug, Serialize)]
pub struct Empty {}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// `scheme://host` the client used to reach us, for absolute links.
///
/// Falls back to `PUBLIC_URL` when the request has no Host header.
pub fn request_base_url(headers: &HeaderMap, config: &Config) -> String {
    let Some(host) = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
    else {
        return config.public_url.clone();
    };

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };
    format!("{}://{}", scheme, host)
}

/// Mount one resource: public routes as-is, protected ones behind `require_auth`.
fn resource(
    state: &Arc<AppState>,
    public: Router<Arc<AppState>>,
    protected: Router<Arc<AppState>>,
) -> Router<Arc<AppState>> {
    public.merge(
        protected.route_layer(middleware::from_fn_with_state(state.clone(), require_auth)),
    )
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow the configured browser origin and localhost (for dev)
    let cors_origin = state.config.cors_origin.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == cors_origin
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let api = Router::new()
        .nest(
            "/users",
            resource(&state, users::public_routes(), users::protected_routes()),
        )
        .nest(
            "/posts",
            resource(&state, posts::public_routes(), posts::protected_routes()),
        )
        .nest(
            "/comments",
            resource(&state, comments::public_routes(), comments::protected_routes()),
        )
        .nest(
            "/categories",
            resource(
                &state,
                categories::public_routes(),
                categories::protected_routes(),
            ),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
