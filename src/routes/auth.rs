//! Auth API endpoints.

use crate::auth::middleware::{AppState, SessionCredential};
use crate::auth::session::{clear_session_cookie, session_cookie};
use crate::auth::AuthDecision;
use crate::error::AppError;
use crate::models::{LoginRequest, SessionStatusResponse, StatusResponse};
use axum::{extract::rejection::JsonRejection, extract::State, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;

/// POST /api/auth/login — Check credentials and open a session
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body?;

    let token = state.gate.authenticate(&req.username, &req.password).await?;

    let cookie = session_cookie(
        &state.config.session_cookie_name,
        &token,
        state.config.session_ttl_secs,
        state.config.cookie_secure,
    );

    Ok((jar.add(cookie), Json(StatusResponse::ok("Login successful"))))
}

/// POST /api/auth/logout — Destroy the current session, if any
pub async fn logout(
    State(state): State<AppState>,
    SessionCredential(token): SessionCredential,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    state.gate.logout(token.as_deref()).await?;

    if token.is_some() {
        tracing::info!(action = "logout", "Admin logged out");
    }

    let jar = jar.add(clear_session_cookie(&state.config.session_cookie_name));
    Ok((jar, Json(StatusResponse::ok("Logged out"))))
}

/// GET /api/auth/session — Report whether the presented session is valid
pub async fn session_status(
    State(state): State<AppState>,
    SessionCredential(token): SessionCredential,
) -> Result<impl IntoResponse, AppError> {
    let response = match state.gate.authorize(token.as_deref()).await? {
        AuthDecision::Authorized { admin_id } => SessionStatusResponse {
            authenticated: true,
            admin_id: Some(admin_id),
        },
        AuthDecision::Unauthorized => SessionStatusResponse {
            authenticated: false,
            admin_id: None,
        },
    };

    Ok(Json(response))
}
