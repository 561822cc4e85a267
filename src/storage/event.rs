//! Event storage operations.
//!
//! Redis key patterns:
//! - `events:next_id` — id counter (INCR)
//! - `event:{id}` — event data (JSON)
//! - `events:by_date` — ZSET of event ids scored by event timestamp
//! - `event_registrations:{id}` — SET of participant ids registered for the event

use super::participant::{event_registrations_key, PARTICIPANT_EVENTS_PREFIX};
use super::StoreError;
use crate::models::{unix_now, Event, NewEvent};
use redis::AsyncCommands;

const NEXT_ID_KEY: &str = "events:next_id";
const BY_DATE_KEY: &str = "events:by_date";

pub(crate) fn event_key(id: u64) -> String {
    format!("event:{}", id)
}

fn date_score(event: &Event) -> i64 {
    event.event_date.and_utc().timestamp()
}

/// Create an event under the next id.
pub async fn create_event<C>(con: &mut C, new_event: &NewEvent) -> Result<Event, StoreError>
where
    C: AsyncCommands,
{
    let id: u64 = con.incr(NEXT_ID_KEY, 1).await?;

    let event = Event {
        event_id: id,
        title: new_event.title.clone(),
        description: new_event.description.clone(),
        event_date: new_event.event_date,
        created_at: unix_now(),
    };
    let json = serde_json::to_string(&event)?;

    // Record and index entry land together.
    let script = redis::Script::new(
        r"
        redis.call('SET', KEYS[1], ARGV[1])
        redis.call('ZADD', KEYS[2], ARGV[2], ARGV[3])
        return 1
        ",
    );
    script
        .key(event_key(id))
        .key(BY_DATE_KEY)
        .arg(json)
        .arg(date_score(&event))
        .arg(id)
        .invoke_async::<()>(con)
        .await?;

    Ok(event)
}

/// Get an event by id.
pub async fn get_event<C>(con: &mut C, id: u64) -> Result<Option<Event>, StoreError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(event_key(id)).await?;
    match json {
        Some(data) => Ok(Some(serde_json::from_str(&data)?)),
        None => Ok(None),
    }
}

/// List all events ordered by date, then id.
///
/// Ids whose record vanished between the ZRANGE and the MGET are skipped.
pub async fn list_events<C>(con: &mut C) -> Result<Vec<Event>, StoreError>
where
    C: AsyncCommands,
{
    let ids: Vec<u64> = con.zrange(BY_DATE_KEY, 0, -1).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<String> = ids.iter().map(|id| event_key(*id)).collect();
    let values: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(con).await?;

    let mut events = values
        .into_iter()
        .flatten()
        .map(|json| serde_json::from_str::<Event>(&json))
        .collect::<Result<Vec<_>, _>>()?;

    // ZSET ties are ordered lexicographically by member, so re-sort numerically.
    events.sort_by(|a, b| {
        a.event_date
            .cmp(&b.event_date)
            .then(a.event_id.cmp(&b.event_id))
    });
    Ok(events)
}

/// Replace an event's fields.
///
/// Record and date index are rewritten by one Lua script; SET XX keeps an
/// event deleted mid-update from being recreated.
pub async fn update_event<C>(
    con: &mut C,
    id: u64,
    new_event: &NewEvent,
) -> Result<Option<Event>, StoreError>
where
    C: AsyncCommands,
{
    let Some(existing) = get_event(con, id).await? else {
        return Ok(None);
    };

    let event = Event {
        title: new_event.title.clone(),
        description: new_event.description.clone(),
        event_date: new_event.event_date,
        ..existing
    };
    let json = serde_json::to_string(&event)?;

    let script = redis::Script::new(
        r"
        if not redis.call('SET', KEYS[1], ARGV[1], 'XX') then
            return 0
        end
        redis.call('ZADD', KEYS[2], 'XX', ARGV[2], ARGV[3])
        return 1
        ",
    );
    let written: i32 = script
        .key(event_key(id))
        .key(BY_DATE_KEY)
        .arg(json)
        .arg(date_score(&event))
        .arg(id)
        .invoke_async(con)
        .await?;
    if written == 0 {
        return Ok(None);
    }

    Ok(Some(event))
}

/// Delete an event together with its registrations.
///
/// Single Lua script so the event, its index entry and both sides of every
/// registration disappear together.
pub async fn delete_event<C>(con: &mut C, id: u64) -> Result<bool, StoreError>
where
    C: AsyncCommands,
{
    let script = redis::Script::new(
        r"
        local existed = redis.call('DEL', KEYS[1])
        redis.call('ZREM', KEYS[2], ARGV[1])
        local members = redis.call('SMEMBERS', KEYS[3])
        for _, pid in ipairs(members) do
            redis.call('SREM', ARGV[2] .. pid, ARGV[1])
        end
        redis.call('DEL', KEYS[3])
        return existed
        ",
    );

    let deleted: i32 = script
        .key(event_key(id))
        .key(BY_DATE_KEY)
        .key(event_registrations_key(id))
        .arg(id)
        .arg(PARTICIPANT_EVENTS_PREFIX)
        .invoke_async(con)
        .await?;

    Ok(deleted > 0)
}
