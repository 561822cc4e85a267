//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models represent the records kept by the store backends.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Current time as unix seconds.
pub fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

// ============================================================================
// Auth Models
// ============================================================================

/// Login request body.
///
/// Fields default to empty so a missing field is reported as invalid input
/// rather than a JSON rejection.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Generic `{success, message}` body used by mutating endpoints.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Response for `GET /api/auth/session`.
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<String>,
}

// ============================================================================
// Event Models
// ============================================================================

/// Body for event create and update.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
}

/// Validated event fields, ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub event_date: NaiveDateTime,
}

/// Response after creating an event.
#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    pub success: bool,
    pub message: String,
    pub event_id: u64,
}

// ============================================================================
// Participant Models
// ============================================================================

/// Body for participant creation.
#[derive(Debug, Deserialize)]
pub struct ParticipantRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Response after creating a participant.
#[derive(Debug, Serialize)]
pub struct CreateParticipantResponse {
    pub success: bool,
    pub message: String,
    pub participant_id: u64,
}

/// Body for signing a participant up for an event.
#[derive(Debug, Deserialize)]
pub struct RegistrationRequest {
    pub participant_id: Option<u64>,
    pub event_id: Option<u64>,
}

/// Participant as listed for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registrant {
    pub participant_id: u64,
    pub name: String,
    pub email: String,
}

// ============================================================================
// Storage Models
// ============================================================================

/// Administrator account.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminAccount {
    pub admin_id: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: u64,
}

impl std::fmt::Debug for AdminAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminAccount")
            .field("admin_id", &self.admin_id)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Server-side admin session.
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub admin_id: String,
    pub created_at: u64,
    pub last_seen_at: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("admin_id", &self.admin_id)
            .field("created_at", &self.created_at)
            .field("last_seen_at", &self.last_seen_at)
            .finish()
    }
}

/// Session lifetime limits, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub absolute_ttl_secs: u64,
    pub idle_ttl_secs: u64,
}

impl Session {
    pub fn new(token: String, admin_id: String, now: u64) -> Self {
        Self {
            token,
            admin_id,
            created_at: now,
            last_seen_at: now,
        }
    }

    /// A session is expired once either limit has been reached.
    pub fn is_expired(&self, policy: &SessionPolicy, now: u64) -> bool {
        now.saturating_sub(self.created_at) >= policy.absolute_ttl_secs
            || now.saturating_sub(self.last_seen_at) >= policy.idle_ttl_secs
    }
}

/// Event as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: u64,
    pub title: String,
    pub description: String,
    pub event_date: NaiveDateTime,
    pub created_at: u64,
}

/// Participant as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub participant_id: u64,
    pub name: String,
    pub email: String,
    pub created_at: u64,
}

impl From<Participant> for Registrant {
    fn from(p: Participant) -> Self {
        Registrant {
            participant_id: p.participant_id,
            name: p.name,
            email: p.email,
        }
    }
}
