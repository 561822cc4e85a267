//! In-process storage backends.
//!
//! `MemorySessionStore` is the default session backend: sessions live in a
//! sharded `DashMap` and vanish on restart. `MemoryStore` keeps admins,
//! events, participants and registrations behind one `RwLock` so
//! multi-record writes (unique indexes, cascading deletes) stay consistent.

use super::{
    email_key, AdminStore, EventStore, ParticipantStore, SessionStore, StoreError,
    DUPLICATE_EMAIL, DUPLICATE_REGISTRATION, EVENT_NOT_FOUND, PARTICIPANT_NOT_FOUND,
};
use crate::auth::session::generate_session_token;
use crate::models::{
    unix_now, AdminAccount, Event, NewEvent, Participant, Registrant, Session, SessionPolicy,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Session store keyed by token.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, admin_id: &str) -> Result<String, StoreError> {
        let token = generate_session_token();
        let session = Session::new(token.clone(), admin_id.to_string(), unix_now());
        self.sessions.insert(token.clone(), session);
        Ok(token)
    }

    async fn lookup(&self, token: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.get(token).map(|entry| entry.value().clone()))
    }

    async fn touch(&self, token: &str, now: u64) -> Result<(), StoreError> {
        // get_mut only updates an entry that is still present.
        if let Some(mut entry) = self.sessions.get_mut(token) {
            entry.last_seen_at = now;
        }
        Ok(())
    }

    async fn destroy(&self, token: &str) -> Result<(), StoreError> {
        self.sessions.remove(token);
        Ok(())
    }

    async fn purge_expired(&self, policy: &SessionPolicy, now: u64) -> Result<usize, StoreError> {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !session.is_expired(policy, now));
        Ok(before.saturating_sub(self.sessions.len()))
    }
}

#[derive(Default)]
struct Tables {
    admins: HashMap<String, AdminAccount>,
    admin_ids_by_username: HashMap<String, String>,
    events: BTreeMap<u64, Event>,
    next_event_id: u64,
    participants: BTreeMap<u64, Participant>,
    participant_ids_by_email: HashMap<String, u64>,
    next_participant_id: u64,
    // (event_id, participant_id)
    registrations: BTreeSet<(u64, u64)>,
}

impl Tables {
    fn drop_registrations(&mut self, pred: impl Fn(&(u64, u64)) -> bool) {
        self.registrations.retain(|pair| !pred(pair));
    }
}

/// In-memory admins, events, participants and registrations.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_admin_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AdminAccount>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .admin_ids_by_username
            .get(username)
            .and_then(|id| tables.admins.get(id))
            .cloned())
    }

    async fn upsert_admin(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<AdminAccount, StoreError> {
        let mut tables = self.tables.write().await;

        let existing = tables
            .admin_ids_by_username
            .get(username)
            .and_then(|id| tables.admins.get(id))
            .cloned();

        let admin = match existing {
            Some(existing) => AdminAccount {
                password_hash: password_hash.to_string(),
                ..existing
            },
            None => AdminAccount {
                admin_id: nanoid::nanoid!(12),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at: unix_now(),
            },
        };

        tables
            .admin_ids_by_username
            .insert(username.to_string(), admin.admin_id.clone());
        tables.admins.insert(admin.admin_id.clone(), admin.clone());
        Ok(admin)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_event(&self, new_event: &NewEvent) -> Result<Event, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_event_id += 1;
        let event = Event {
            event_id: tables.next_event_id,
            title: new_event.title.clone(),
            description: new_event.description.clone(),
            event_date: new_event.event_date,
            created_at: unix_now(),
        };
        tables.events.insert(event.event_id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: u64) -> Result<Option<Event>, StoreError> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables.events.values().cloned().collect();
        // BTreeMap iteration is already id-ordered; stable sort keeps that for ties.
        events.sort_by(|a, b| a.event_date.cmp(&b.event_date));
        Ok(events)
    }

    async fn update_event(&self, id: u64, new_event: &NewEvent) -> Result<Option<Event>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(event) = tables.events.get_mut(&id) else {
            return Ok(None);
        };
        event.title = new_event.title.clone();
        event.description = new_event.description.clone();
        event.event_date = new_event.event_date;
        Ok(Some(event.clone()))
    }

    async fn delete_event(&self, id: u64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.events.remove(&id).is_none() {
            return Ok(false);
        }
        tables.drop_registrations(|(event_id, _)| *event_id == id);
        Ok(true)
    }
}

#[async_trait]
impl ParticipantStore for MemoryStore {
    async fn create_participant(
        &self,
        name: &str,
        email: &str,
    ) -> Result<Participant, StoreError> {
        let mut tables = self.tables.write().await;
        let key = email_key(email);
        if tables.participant_ids_by_email.contains_key(&key) {
            return Err(StoreError::Duplicate(DUPLICATE_EMAIL.to_string()));
        }

        tables.next_participant_id += 1;
        let participant = Participant {
            participant_id: tables.next_participant_id,
            name: name.to_string(),
            email: email.to_string(),
            created_at: unix_now(),
        };
        tables
            .participant_ids_by_email
            .insert(key, participant.participant_id);
        tables
            .participants
            .insert(participant.participant_id, participant.clone());
        Ok(participant)
    }

    async fn list_participants(&self) -> Result<Vec<Participant>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.participants.values().rev().cloned().collect())
    }

    async fn delete_participant(&self, id: u64) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(participant) = tables.participants.remove(&id) else {
            return Ok(false);
        };
        tables
            .participant_ids_by_email
            .remove(&email_key(&participant.email));
        tables.drop_registrations(|(_, participant_id)| *participant_id == id);
        Ok(true)
    }

    async fn register(&self, participant_id: u64, event_id: u64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&event_id) {
            return Err(StoreError::MissingReference(EVENT_NOT_FOUND.to_string()));
        }
        if !tables.participants.contains_key(&participant_id) {
            return Err(StoreError::MissingReference(
                PARTICIPANT_NOT_FOUND.to_string(),
            ));
        }
        if !tables.registrations.insert((event_id, participant_id)) {
            return Err(StoreError::Duplicate(DUPLICATE_REGISTRATION.to_string()));
        }
        Ok(())
    }

    async fn registrants(&self, event_id: u64) -> Result<Option<Vec<Registrant>>, StoreError> {
        let tables = self.tables.read().await;
        if !tables.events.contains_key(&event_id) {
            return Ok(None);
        }
        let registrants = tables
            .registrations
            .range((event_id, 0)..=(event_id, u64::MAX))
            .filter_map(|(_, pid)| tables.participants.get(pid))
            .cloned()
            .map(Registrant::from)
            .collect();
        Ok(Some(registrants))
    }
}
