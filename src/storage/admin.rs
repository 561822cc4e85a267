//! Admin account Redis operations.
//!
//! Redis key patterns:
//! - `admin:{nanoid}` — admin account (JSON, no TTL)
//! - `admin_username:{username}` — username lookup to admin_id (STRING)

use super::StoreError;
use crate::models::{unix_now, AdminAccount};
use redis::AsyncCommands;
use zeroize::Zeroizing;

fn admin_key(id: &str) -> String {
    format!("admin:{}", id)
}

fn username_key(username: &str) -> String {
    format!("admin_username:{}", username)
}

/// Get an admin by ID.
///
/// The admin JSON holds the password hash and is zeroized after deserialization.
pub async fn get_admin<C>(con: &mut C, id: &str) -> Result<Option<AdminAccount>, StoreError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(admin_key(id)).await?;

    match json {
        Some(data) => {
            let zeroizing_data = Zeroizing::new(data);
            let admin = serde_json::from_str(&zeroizing_data)?;
            Ok(Some(admin))
        }
        None => Ok(None),
    }
}

/// Get an admin by username.
///
/// Performs a two-step lookup: username -> admin_id -> admin data.
pub async fn get_admin_by_username<C>(
    con: &mut C,
    username: &str,
) -> Result<Option<AdminAccount>, StoreError>
where
    C: AsyncCommands,
{
    let admin_id: Option<String> = con.get(username_key(username)).await?;

    match admin_id {
        Some(id) => get_admin(con, &id).await,
        None => Ok(None),
    }
}

/// Upsert an admin account (permanent, no TTL).
///
/// The username index is claimed with SET NX so two concurrent upserts of a
/// new username agree on one admin_id. An existing account keeps its id and
/// creation time; only the hash is replaced.
pub async fn upsert_admin<C>(
    con: &mut C,
    username: &str,
    password_hash: &str,
) -> Result<AdminAccount, StoreError>
where
    C: AsyncCommands,
{
    let candidate_id = nanoid::nanoid!(12);
    let claimed: bool = con.set_nx(username_key(username), &candidate_id).await?;

    let admin = if claimed {
        AdminAccount {
            admin_id: candidate_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: unix_now(),
        }
    } else {
        let existing_id: String = con.get(username_key(username)).await?;
        match get_admin(con, &existing_id).await? {
            Some(existing) => AdminAccount {
                password_hash: password_hash.to_string(),
                ..existing
            },
            None => {
                tracing::warn!(
                    username = %username,
                    admin_id = %existing_id,
                    "Username index points at a missing admin record; recreating it"
                );
                AdminAccount {
                    admin_id: existing_id,
                    username: username.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: unix_now(),
                }
            }
        }
    };

    let json = Zeroizing::new(serde_json::to_string(&admin)?);
    con.set::<_, _, ()>(admin_key(&admin.admin_id), json.as_str())
        .await?;

    Ok(admin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_keeps_identity() {
        // Requires a running Redis instance; skipped otherwise.
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let Ok(client) = redis::Client::open(redis_url) else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let Ok(mut con) = client.get_multiplexed_async_connection().await else {
            eprintln!("Skipping test: Redis connection failed");
            return;
        };

        let username = format!("test_{}", nanoid::nanoid!(8, &nanoid::alphabet::SAFE));
        let first = upsert_admin(&mut con, &username, "hash-one").await.unwrap();
        let second = upsert_admin(&mut con, &username, "hash-two").await.unwrap();

        assert_eq!(first.admin_id, second.admin_id);
        assert_eq!(first.created_at, second.created_at);

        let loaded = get_admin_by_username(&mut con, &username)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.password_hash, "hash-two");

        assert!(get_admin_by_username(&mut con, "no_such_admin_xyz")
            .await
            .unwrap()
            .is_none());

        // Clean up
        let _: Result<(), _> = con.del(admin_key(&first.admin_id)).await;
        let _: Result<(), _> = con.del(username_key(&username)).await;
    }

    #[tokio::test]
    async fn test_upsert_repairs_dangling_username_index() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let Ok(client) = redis::Client::open(redis_url) else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let Ok(mut con) = client.get_multiplexed_async_connection().await else {
            eprintln!("Skipping test: Redis connection failed");
            return;
        };

        let username = format!("test_{}", nanoid::nanoid!(8, &nanoid::alphabet::SAFE));
        let dangling_id = nanoid::nanoid!(12);
        con.set::<_, _, ()>(username_key(&username), &dangling_id)
            .await
            .unwrap();

        let admin = upsert_admin(&mut con, &username, "hash-new").await.unwrap();
        assert_eq!(admin.admin_id, dangling_id);

        let loaded = get_admin_by_username(&mut con, &username)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.admin_id, dangling_id);
        assert_eq!(loaded.password_hash, "hash-new");

        let _: Result<(), _> = con.del(admin_key(&dangling_id)).await;
        let _: Result<(), _> = con.del(username_key(&username)).await;
    }
}
