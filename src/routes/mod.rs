//! API route handlers.

pub mod auth;
pub mod events;
pub mod participants;

use crate::auth::middleware::AppState;
use crate::middleware::{cors_layer, security_headers};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

/// GET /health — Liveness probe
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth endpoints
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/session", get(auth::session_status))
        // Event endpoints
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/events/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/api/events/{id}/registrations",
            get(events::list_registrations),
        )
        // Participant endpoints
        .route(
            "/api/participants",
            post(participants::create_participant).get(participants::list_participants),
        )
        .route(
            "/api/participants/{id}",
            delete(participants::delete_participant),
        )
        .route("/api/registrations", post(participants::register))
        .route("/health", get(health))
}

/// The complete application: API routes plus body limit, CORS and
/// security headers, bound to `state`.
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    api_router()
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state)
}
