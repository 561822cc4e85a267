//! Participant and registration Redis operations.
//!
//! Redis key patterns:
//! - `participants:next_id` — id counter (INCR)
//! - `participant:{id}` — participant data (JSON)
//! - `participant_email:{email}` — unique email index to participant id
//! - `participants:all` — ZSET of participant ids scored by id
//! - `event_registrations:{event_id}` — SET of participant ids
//! - `participant_events:{participant_id}` — SET of event ids

use super::event::event_key;
use super::{
    email_key, StoreError, DUPLICATE_EMAIL, DUPLICATE_REGISTRATION, EVENT_NOT_FOUND,
    PARTICIPANT_NOT_FOUND,
};
use crate::models::{unix_now, Participant, Registrant};
use redis::AsyncCommands;

const NEXT_ID_KEY: &str = "participants:next_id";
const ALL_KEY: &str = "participants:all";
pub(crate) const EVENT_REGISTRATIONS_PREFIX: &str = "event_registrations:";
pub(crate) const PARTICIPANT_EVENTS_PREFIX: &str = "participant_events:";

fn participant_key(id: u64) -> String {
    format!("participant:{}", id)
}

fn email_index_key(email: &str) -> String {
    format!("participant_email:{}", email_key(email))
}

pub(crate) fn event_registrations_key(event_id: u64) -> String {
    format!("{}{}", EVENT_REGISTRATIONS_PREFIX, event_id)
}

fn participant_events_key(participant_id: u64) -> String {
    format!("{}{}", PARTICIPANT_EVENTS_PREFIX, participant_id)
}

/// Create a participant.
///
/// The email index claim, the record and the listing entry are written by
/// one Lua script; a taken email leaves nothing behind.
pub async fn create_participant<C>(
    con: &mut C,
    name: &str,
    email: &str,
) -> Result<Participant, StoreError>
where
    C: AsyncCommands,
{
    let id: u64 = con.incr(NEXT_ID_KEY, 1).await?;

    let participant = Participant {
        participant_id: id,
        name: name.to_string(),
        email: email.to_string(),
        created_at: unix_now(),
    };
    let json = serde_json::to_string(&participant)?;

    let script = redis::Script::new(
        r"
        if not redis.call('SET', KEYS[3], ARGV[2], 'NX') then
            return 0
        end
        redis.call('SET', KEYS[1], ARGV[1])
        redis.call('ZADD', KEYS[2], ARGV[2], ARGV[2])
        return 1
        ",
    );
    let created: i32 = script
        .key(participant_key(id))
        .key(ALL_KEY)
        .key(email_index_key(email))
        .arg(json)
        .arg(id)
        .invoke_async(con)
        .await?;

    if created == 0 {
        return Err(StoreError::Duplicate(DUPLICATE_EMAIL.to_string()));
    }

    Ok(participant)
}

/// Get a participant by id.
pub async fn get_participant<C>(con: &mut C, id: u64) -> Result<Option<Participant>, StoreError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(participant_key(id)).await?;
    match json {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

async fn get_participants<C>(con: &mut C, ids: &[u64]) -> Result<Vec<Participant>, StoreError>
where
    C: AsyncCommands,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let keys: Vec<String> = ids.iter().map(|id| participant_key(*id)).collect();
    let values: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(con).await?;

    let participants = values
        .into_iter()
        .flatten()
        .map(|json| serde_json::from_str::<Participant>(&json))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(participants)
}

/// List all participants, newest first.
pub async fn list_participants<C>(con: &mut C) -> Result<Vec<Participant>, StoreError>
where
    C: AsyncCommands,
{
    let ids: Vec<u64> = con.zrevrange(ALL_KEY, 0, -1).await?;
    get_participants(con, &ids).await
}

/// Delete a participant, its email index entry and its registrations.
pub async fn delete_participant<C>(con: &mut C, id: u64) -> Result<bool, StoreError>
where
    C: AsyncCommands,
{
    let Some(participant) = get_participant(con, id).await? else {
        return Ok(false);
    };

    let script = redis::Script::new(
        r"
        local existed = redis.call('DEL', KEYS[1])
        if existed == 0 then
            return 0
        end
        redis.call('ZREM', KEYS[2], ARGV[1])
        redis.call('DEL', KEYS[3])
        local events = redis.call('SMEMBERS', KEYS[4])
        for _, eid in ipairs(events) do
            redis.call('SREM', ARGV[2] .. eid, ARGV[1])
        end
        redis.call('DEL', KEYS[4])
        return 1
        ",
    );

    let deleted: i32 = script
        .key(participant_key(id))
        .key(ALL_KEY)
        .key(email_index_key(&participant.email))
        .key(participant_events_key(id))
        .arg(id)
        .arg(EVENT_REGISTRATIONS_PREFIX)
        .invoke_async(con)
        .await?;

    Ok(deleted > 0)
}

/// Register a participant for an event.
///
/// Existence checks and both set insertions run in one Lua script, so a
/// registration never points at a record deleted concurrently.
pub async fn register<C>(con: &mut C, participant_id: u64, event_id: u64) -> Result<(), StoreError>
where
    C: AsyncCommands,
{
    let script = redis::Script::new(
        r"
        if redis.call('EXISTS', KEYS[1]) == 0 then
            return -1
        end
        if redis.call('EXISTS', KEYS[2]) == 0 then
            return -2
        end
        if redis.call('SADD', KEYS[3], ARGV[1]) == 0 then
            return 0
        end
        redis.call('SADD', KEYS[4], ARGV[2])
        return 1
        ",
    );

    let outcome: i32 = script
        .key(event_key(event_id))
        .key(participant_key(participant_id))
        .key(event_registrations_key(event_id))
        .key(participant_events_key(participant_id))
        .arg(participant_id)
        .arg(event_id)
        .invoke_async(con)
        .await?;

    match outcome {
        1 => Ok(()),
        0 => Err(StoreError::Duplicate(DUPLICATE_REGISTRATION.to_string())),
        -1 => Err(StoreError::MissingReference(EVENT_NOT_FOUND.to_string())),
        _ => Err(StoreError::MissingReference(
            PARTICIPANT_NOT_FOUND.to_string(),
        )),
    }
}

/// List the participants registered for an event, ordered by participant id.
pub async fn registrants<C>(con: &mut C, event_id: u64) -> Result<Option<Vec<Registrant>>, StoreError>
where
    C: AsyncCommands,
{
    let exists: bool = con.exists(event_key(event_id)).await?;
    if !exists {
        return Ok(None);
    }

    let mut ids: Vec<u64> = con.smembers(event_registrations_key(event_id)).await?;
    ids.sort_unstable();

    let registrants = get_participants(con, &ids)
        .await?
        .into_iter()
        .map(Registrant::from)
        .collect();
    Ok(Some(registrants))
}
