//! Event API endpoints. Reads are public; writes require AdminSession.

use crate::auth::middleware::{AdminSession, AppState};
use crate::error::AppError;
use crate::models::{CreateEventResponse, EventRequest, NewEvent, StatusResponse};
use crate::storage::EVENT_NOT_FOUND;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, NaiveDateTime};

const MAX_TITLE_CHARS: usize = 200;
const MAX_DESCRIPTION_CHARS: usize = 5000;

/// Parse an event date. A bare date means midnight.
fn parse_event_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Validate an event body into storable fields.
fn validate_event(req: EventRequest) -> Result<NewEvent, AppError> {
    let title = req.title.trim();
    let description = req.description.trim();
    if title.is_empty() || req.date.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and date are required".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Title must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::BadRequest(format!(
            "Description must be at most {} characters",
            MAX_DESCRIPTION_CHARS
        )));
    }

    let event_date = parse_event_date(&req.date).ok_or_else(|| {
        AppError::BadRequest("Invalid date format, expected YYYY-MM-DD [HH:MM[:SS]]".to_string())
    })?;

    Ok(NewEvent {
        title: title.to_string(),
        description: description.to_string(),
        event_date,
    })
}

/// GET /api/events — List events, soonest first
pub async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let events = state.events.list_events().await?;
    Ok(Json(events))
}

/// GET /api/events/{id} — Fetch one event
pub async fn get_event(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;

    let event = state
        .events
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(EVENT_NOT_FOUND.to_string()))?;

    Ok(Json(event))
}

/// POST /api/events — Create event
pub async fn create_event(
    session: AdminSession,
    State(state): State<AppState>,
    body: Result<Json<EventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body?;
    let new_event = validate_event(req)?;

    let event = state.events.create_event(&new_event).await?;

    tracing::info!(action = "event_created", event_id = event.event_id, admin_id = %session.admin_id, "Admin created event");

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            success: true,
            message: "Event created successfully".to_string(),
            event_id: event.event_id,
        }),
    ))
}

/// PUT /api/events/{id} — Update event
pub async fn update_event(
    session: AdminSession,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
    body: Result<Json<EventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(req) = body?;
    let new_event = validate_event(req)?;

    state
        .events
        .update_event(id, &new_event)
        .await?
        .ok_or_else(|| AppError::NotFound(EVENT_NOT_FOUND.to_string()))?;

    tracing::info!(action = "event_updated", event_id = id, admin_id = %session.admin_id, "Admin updated event");

    Ok(Json(StatusResponse::ok("Event updated successfully")))
}

/// DELETE /api/events/{id} — Delete event and its registrations
pub async fn delete_event(
    session: AdminSession,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;

    if !state.events.delete_event(id).await? {
        return Err(AppError::NotFound(EVENT_NOT_FOUND.to_string()));
    }

    tracing::info!(action = "event_deleted", event_id = id, admin_id = %session.admin_id, "Admin deleted event");

    Ok(Json(StatusResponse::ok("Event deleted successfully")))
}

/// GET /api/events/{id}/registrations — Participants signed up for an event
pub async fn list_registrations(
    _session: AdminSession,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;

    let registrants = state
        .participants
        .registrants(id)
        .await?
        .ok_or_else(|| AppError::NotFound(EVENT_NOT_FOUND.to_string()))?;

    Ok(Json(registrants))
}
