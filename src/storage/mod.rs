//! Storage layer for admins, sessions, events, participants and registrations.
//!
//! Every concern sits behind an async trait so handlers and the auth gate
//! only see `Arc<dyn …>`. Two backends implement them:
//! - [`redis_store::RedisStore`] — JSON records in Redis (free functions in the
//!   `admin`, `session`, `event` and `participant` modules)
//! - [`memory::MemoryStore`] / [`memory::MemorySessionStore`] — in-process maps

pub mod admin;
pub mod event;
pub mod memory;
pub mod participant;
pub mod redis_store;
pub mod session;

use crate::models::{
    AdminAccount, Event, NewEvent, Participant, Registrant, Session, SessionPolicy,
};
use async_trait::async_trait;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or queried.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be decoded.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Duplicate(String),

    /// A referenced record does not exist.
    #[error("{0}")]
    MissingReference(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(format!("Redis error: {}", err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Corrupt(format!("JSON error: {}", err))
    }
}

/// Credential store: admin accounts keyed by unique username.
#[async_trait]
pub trait AdminStore: Send + Sync {
    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminAccount>, StoreError>;

    /// Create the admin if the username is new, otherwise replace its hash.
    /// Returns the stored account.
    async fn upsert_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<AdminAccount, StoreError>;
}

/// Session store: opaque token -> session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session for `admin_id` under a freshly generated token.
    async fn create(&self, admin_id: &str) -> Result<String, StoreError>;

    async fn lookup(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Record activity. Never recreates a session that was destroyed.
    async fn touch(&self, token: &str, now: u64) -> Result<(), StoreError>;

    /// Remove a session. Destroying an unknown token is not an error.
    async fn destroy(&self, token: &str) -> Result<(), StoreError>;

    /// Drop every expired session, returning how many were removed.
    async fn purge_expired(&self, policy: &SessionPolicy, now: u64) -> Result<usize, StoreError>;
}

/// Event records.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: &NewEvent) -> Result<Event, StoreError>;

    async fn get_event(&self, id: u64) -> Result<Option<Event>, StoreError>;

    /// Ordered by event date, then id.
    async fn list_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Returns `None` if the event does not exist.
    async fn update_event(&self, id: u64, event: &NewEvent) -> Result<Option<Event>, StoreError>;

    /// Deletes the event and its registrations. Returns false if it did not exist.
    async fn delete_event(&self, id: u64) -> Result<bool, StoreError>;
}

/// Participant records and event registrations.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] if the email is taken.
    async fn create_participant(&self, name: &str, email: &str)
        -> Result<Participant, StoreError>;

    /// Newest first.
    async fn list_participants(&self) -> Result<Vec<Participant>, StoreError>;

    /// Deletes the participant and its registrations. Returns false if it did not exist.
    async fn delete_participant(&self, id: u64) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::MissingReference`] for an unknown event or
    /// participant and [`StoreError::Duplicate`] if already registered.
    async fn register(&self, participant_id: u64, event_id: u64) -> Result<(), StoreError>;

    /// Ordered by participant id. `None` if the event does not exist.
    async fn registrants(&self, event_id: u64) -> Result<Option<Vec<Registrant>>, StoreError>;
}

/// Lowercased, trimmed email used for the uniqueness index.
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) const DUPLICATE_EMAIL: &str = "Email already exists";
pub(crate) const DUPLICATE_REGISTRATION: &str = "Participant already registered for this event";
pub(crate) const EVENT_NOT_FOUND: &str = "Event not found";
pub(crate) const PARTICIPANT_NOT_FOUND: &str = "Participant not found";
