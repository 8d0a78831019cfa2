use chrono::{DateTime, Utc};
use sqlx::SqliteExecutor;
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Database};

const CURRENT_USER_KEY: &str = "current_user";
const LAST_SYNC_KEY: &str = "last_sync";

/// Small key/value table for device-local state: the signed-in user and the
/// time of the last successful sync.
pub struct MetaRepository {
    db: Database,
}

pub(crate) async fn get_value<'e, E>(executor: E, key: &str) -> Result<Option<String>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM meta WHERE key = ?")
        .bind(key)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(|(value,)| value))
}

pub(crate) async fn set_value<'e, E>(executor: E, key: &str, value: &str) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO meta (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn delete_value<'e, E>(executor: E, key: &str) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("DELETE FROM meta WHERE key = ?")
        .bind(key)
        .execute(executor)
        .await?;

    Ok(())
}

pub(crate) async fn read_last_sync<'e, E>(executor: E) -> Result<Option<DateTime<Utc>>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    get_value(executor, LAST_SYNC_KEY)
        .await?
        .map(|v| parse_timestamp(&v))
        .transpose()
}

pub(crate) async fn write_last_sync<'e, E>(
    executor: E,
    last_sync: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    match last_sync {
        Some(at) => set_value(executor, LAST_SYNC_KEY, &at.to_rfc3339()).await,
        None => delete_value(executor, LAST_SYNC_KEY).await,
    }
}

impl MetaRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, sqlx::Error> {
        get_value(self.db.pool(), key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), sqlx::Error> {
        set_value(self.db.pool(), key, value).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), sqlx::Error> {
        delete_value(self.db.pool(), key).await
    }

    pub async fn current_user(&self) -> Result<Option<Uuid>, sqlx::Error> {
        self.get(CURRENT_USER_KEY)
            .await?
            .map(|v| parse_uuid(&v))
            .transpose()
    }

    pub async fn set_current_user(&self, user_id: Option<Uuid>) -> Result<(), sqlx::Error> {
        match user_id {
            Some(id) => self.set(CURRENT_USER_KEY, &id.to_string()).await,
            None => self.delete(CURRENT_USER_KEY).await,
        }
    }

    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
        read_last_sync(self.db.pool()).await
    }
}
