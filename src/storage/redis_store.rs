//! Redis-backed implementation of every storage trait.

use super::{admin, event, participant, session};
use super::{AdminStore, EventStore, ParticipantStore, SessionStore, StoreError};
use crate::auth::session::generate_session_token;
use crate::models::{
    unix_now, AdminAccount, Event, NewEvent, Participant, Registrant, Session, SessionPolicy,
};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

/// Store backed by a Redis server.
///
/// Sessions are written with the absolute lifetime as key TTL, so Redis
/// evicts them on its own; idle expiry is enforced by the auth gate.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    session_ttl_secs: u64,
}

impl RedisStore {
    pub fn new(client: redis::Client, session_ttl_secs: u64) -> Self {
        Self {
            client,
            session_ttl_secs,
        }
    }

    pub fn open(redis_url: &str, session_ttl_secs: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client, session_ttl_secs))
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Redis connection error: {}", e)))
    }

    /// Verify the server is reachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        redis::cmd("PING").query_async::<()>(&mut con).await?;
        Ok(())
    }
}

#[async_trait]
impl AdminStore for RedisStore {
    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminAccount>, StoreError> {
        let mut con = self.connection().await?;
        admin::get_admin_by_username(&mut con, username).await
    }

    async fn upsert_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<AdminAccount, StoreError> {
        let mut con = self.connection().await?;
        admin::upsert_admin(&mut con, username, password_hash).await
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn create(&self, admin_id: &str) -> Result<String, StoreError> {
        let mut con = self.connection().await?;
        let token = generate_session_token();
        let session = Session::new(token.clone(), admin_id.to_string(), unix_now());
        session::store_session(&mut con, &session, self.session_ttl_secs).await?;
        Ok(token)
    }

    async fn lookup(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let mut con = self.connection().await?;
        session::get_session(&mut con, token).await
    }

    async fn touch(&self, token: &str, now: u64) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        session::touch_session(&mut con, token, now).await?;
        Ok(())
    }

    async fn destroy(&self, token: &str) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        session::delete_session(&mut con, token).await?;
        Ok(())
    }

    async fn purge_expired(&self, _policy: &SessionPolicy, _now: u64) -> Result<usize, StoreError> {
        // Key TTLs handle absolute expiry; idle sessions are dropped lazily on lookup.
        Ok(0)
    }
}

#[async_trait]
impl EventStore for RedisStore {
    async fn create_event(&self, new_event: &NewEvent) -> Result<Event, StoreError> {
        let mut con = self.connection().await?;
        event::create_event(&mut con, new_event).await
    }

    async fn get_event(&self, id: u64) -> Result<Option<Event>, StoreError> {
        let mut con = self.connection().await?;
        event::get_event(&mut con, id).await
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let mut con = self.connection().await?;
        event::list_events(&mut con).await
    }

    async fn update_event(&self, id: u64, new_event: &NewEvent) -> Result<Option<Event>, StoreError> {
        let mut con = self.connection().await?;
        event::update_event(&mut con, id, new_event).await
    }

    async fn delete_event(&self, id: u64) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        event::delete_event(&mut con, id).await
    }
}

#[async_trait]
impl ParticipantStore for RedisStore {
    async fn create_participant(
        &self,
        name: &str,
        email: &str,
    ) -> Result<Participant, StoreError> {
        let mut con = self.connection().await?;
        participant::create_participant(&mut con, name, email).await
    }

    async fn list_participants(&self) -> Result<Vec<Participant>, StoreError> {
        let mut con = self.connection().await?;
        participant::list_participants(&mut con).await
    }

    async fn delete_participant(&self, id: u64) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        participant::delete_participant(&mut con, id).await
    }

    async fn register(&self, participant_id: u64, event_id: u64) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        participant::register(&mut con, participant_id, event_id).await
    }

    async fn registrants(&self, event_id: u64) -> Result<Option<Vec<Registrant>>, StoreError> {
        let mut con = self.connection().await?;
        participant::registrants(&mut con, event_id).await
    }
}
