//! Session Redis operations.
//!
//! Redis key patterns:
//! - `session:{token}` — session data (JSON), TTL = absolute session lifetime
//!
//! ## Security: Zeroizing Sensitive Data
//!
//! Session JSON carries the bearer token, so the raw string read back from
//! Redis is wrapped in `Zeroizing` and cleared once deserialized.

use super::StoreError;
use crate::models::Session;
use redis::AsyncCommands;
use zeroize::Zeroizing;

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// Store a session in Redis with TTL.
pub async fn store_session<C>(
    con: &mut C,
    session: &Session,
    ttl_secs: u64,
) -> Result<(), StoreError>
where
    C: AsyncCommands,
{
    let json = Zeroizing::new(serde_json::to_string(session)?);
    con.set_ex::<_, _, ()>(session_key(&session.token), json.as_str(), ttl_secs)
        .await?;
    Ok(())
}

/// Get a session by token.
///
/// The session JSON is zeroized after deserialization.
pub async fn get_session<C>(con: &mut C, token: &str) -> Result<Option<Session>, StoreError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(session_key(token)).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let session = serde_json::from_str(&zeroizing_data)?;
            Ok(Some(session))
        }
        None => Ok(None),
    }
}

/// Update `last_seen_at` in place, keeping the key's TTL.
///
/// Runs as a Lua script so a concurrent DEL either wins outright or lands
/// after the rewrite; a deleted session is never written back.
pub async fn touch_session<C>(con: &mut C, token: &str, now: u64) -> Result<bool, StoreError>
where
    C: AsyncCommands,
{
    let script = redis::Script::new(
        r"
        local val = redis.call('GET', KEYS[1])
        if not val then
            return 0
        end
        local obj = cjson.decode(val)
        obj.last_seen_at = tonumber(ARGV[1])
        redis.call('SET', KEYS[1], cjson.encode(obj), 'KEEPTTL')
        return 1
        ",
    );

    let touched: i32 = script
        .key(session_key(token))
        .arg(now)
        .invoke_async(con)
        .await?;
    Ok(touched == 1)
}

/// Delete a session from Redis.
///
/// Returns true if the session was deleted, false if it didn't exist.
pub async fn delete_session<C>(con: &mut C, token: &str) -> Result<bool, StoreError>
where
    C: AsyncCommands,
{
    let deleted: i32 = con.del(session_key(token)).await?;
    Ok(deleted > 0)
}
