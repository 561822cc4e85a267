//! Axum extractors for the admin session gate.

use super::gate::AuthGate;
use crate::config::Config;
use crate::error::AppError;
use crate::storage::{EventStore, ParticipantStore};
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthGate>,
    pub events: Arc<dyn EventStore>,
    pub participants: Arc<dyn ParticipantStore>,
    pub config: Arc<Config>,
}

/// Pull the session credential out of a request.
///
/// The session cookie wins; `Authorization: Bearer {token}` is accepted for
/// clients that don't keep cookies.
pub fn session_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Authorized admin session extractor.
///
/// Handlers that take this parameter only run once the gate has authorized
/// the request. Otherwise the request is rejected with 401 (or 503 when the
/// session store can't be reached) and the handler body never executes.
pub struct AdminSession {
    pub admin_id: String,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts, &state.config.session_cookie_name);

        let admin_id = state.gate.require_authorized(token.as_deref()).await?;

        Ok(AdminSession { admin_id })
    }
}

/// Optional session credential, for endpoints that never reject.
pub struct SessionCredential(pub Option<String>);

impl FromRequestParts<AppState> for SessionCredential {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(SessionCredential(session_token(
            parts,
            &state.config.session_cookie_name,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_token_from_cookie() {
        let parts = parts_with(&[("cookie", "theme=dark; eventreg_session=abc123")]);
        assert_eq!(
            session_token(&parts, "eventreg_session").as_deref(),
            Some("abc123")
        );
    }

    #[test]
    fn test_token_from_bearer_header() {
        let parts = parts_with(&[("authorization", "Bearer xyz789")]);
        assert_eq!(
            session_token(&parts, "eventreg_session").as_deref(),
            Some("xyz789")
        );
    }

    #[test]
    fn test_cookie_preferred_over_header() {
        let parts = parts_with(&[
            ("cookie", "eventreg_session=from-cookie"),
            ("authorization", "Bearer from-header"),
        ]);
        assert_eq!(
            session_token(&parts, "eventreg_session").as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn test_missing_or_malformed_credentials() {
        assert_eq!(session_token(&parts_with(&[]), "eventreg_session"), None);
        assert_eq!(
            session_token(
                &parts_with(&[("authorization", "Basic YWRtaW46YWRtaW4=")]),
                "eventreg_session"
            ),
            None
        );
        assert_eq!(
            session_token(&parts_with(&[("authorization", "Bearer ")]), "eventreg_session"),
            None
        );
        assert_eq!(
            session_token(&parts_with(&[("cookie", "other=abc")]), "eventreg_session"),
            None
        );
    }
}
