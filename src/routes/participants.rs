//! Participant and registration API endpoints.
//!
//! Signing up is public. Listing and deleting participants require
//! AdminSession, since the list exposes every email address.

use crate::auth::middleware::{AdminSession, AppState};
use crate::error::AppError;
use crate::models::{
    CreateParticipantResponse, ParticipantRequest, RegistrationRequest, StatusResponse,
};
use crate::storage::PARTICIPANT_NOT_FOUND;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};

const MAX_NAME_CHARS: usize = 100;
const MAX_EMAIL_LEN: usize = 254;

/// Shape check only: one '@' with something on both sides, no whitespace.
fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

/// POST /api/participants — Create participant
pub async fn create_participant(
    State(state): State<AppState>,
    body: Result<Json<ParticipantRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body?;

    let name = req.name.trim();
    let email = req.email.trim();

    if name.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest(
            "Name and email are required".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "Name must be at most {} characters",
            MAX_NAME_CHARS
        )));
    }
    if !is_valid_email(email) {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }

    let participant = state.participants.create_participant(name, email).await?;

    tracing::info!(
        action = "participant_created",
        participant_id = participant.participant_id,
        "Participant added"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateParticipantResponse {
            success: true,
            message: "Participant added successfully".to_string(),
            participant_id: participant.participant_id,
        }),
    ))
}

/// GET /api/participants — List participants, newest first
pub async fn list_participants(
    _session: AdminSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let participants = state.participants.list_participants().await?;
    Ok(Json(participants))
}

/// DELETE /api/participants/{id} — Delete participant and their registrations
pub async fn delete_participant(
    session: AdminSession,
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;

    if !state.participants.delete_participant(id).await? {
        return Err(AppError::NotFound(PARTICIPANT_NOT_FOUND.to_string()));
    }

    tracing::info!(action = "participant_deleted", participant_id = id, admin_id = %session.admin_id, "Admin deleted participant");

    Ok(Json(StatusResponse::ok("Participant deleted successfully")))
}

/// POST /api/registrations — Sign a participant up for an event
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegistrationRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = body?;

    let (Some(participant_id), Some(event_id)) = (
        req.participant_id.filter(|id| *id > 0),
        req.event_id.filter(|id| *id > 0),
    ) else {
        return Err(AppError::BadRequest(
            "Participant ID and Event ID are required".to_string(),
        ));
    };

    state.participants.register(participant_id, event_id).await?;

    tracing::info!(
        action = "registration_created",
        participant_id = participant_id,
        event_id = event_id,
        "Participant registered for event"
    );

    Ok((
        StatusCode::CREATED,
        Json(StatusResponse::ok("Registration successful")),
    ))
}
