mod meta_repo;
mod share_grant_repo;
mod snapshot_repo;
mod usage_day_repo;
mod user_repo;
mod vehicle_repo;

pub use meta_repo::MetaRepository;
pub use share_grant_repo::ShareGrantRepository;
pub use snapshot_repo::SnapshotRepository;
pub use usage_day_repo::UsageDayRepository;
pub use user_repo::UserRepository;
pub use vehicle_repo::VehicleRepository;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Handle to the local store: the connection pool plus one write lock per
/// collection.
///
/// Cloning is cheap and every clone shares the same pool and locks. Code that
/// reads a collection, decides, and then writes it must hold that
/// collection's lock for the whole sequence. When more than one lock is
/// needed they are taken in the order users, vehicles, usage_days,
/// share_grants.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    locks: Arc<CollectionLocks>,
}

#[derive(Debug, Default)]
pub struct CollectionLocks {
    pub users: Mutex<()>,
    pub vehicles: Mutex<()>,
    pub usage_days: Mutex<()>,
    pub share_grants: Mutex<()>,
}

/// All four collection locks, held together for whole-snapshot reads and writes.
pub struct AllCollectionsGuard<'a> {
    _users: MutexGuard<'a, ()>,
    _vehicles: MutexGuard<'a, ()>,
    _usage_days: MutexGuard<'a, ()>,
    _share_grants: MutexGuard<'a, ()>,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: Arc::new(CollectionLocks::default()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn locks(&self) -> &CollectionLocks {
        &self.locks
    }

    pub async fn lock_all(&self) -> AllCollectionsGuard<'_> {
        AllCollectionsGuard {
            _users: self.locks.users.lock().await,
            _vehicles: self.locks.vehicles.lock().await,
            _usage_days: self.locks.usage_days.lock().await,
            _share_grants: self.locks.share_grants.lock().await,
        }
    }
}

/// Open (creating if needed) the SQLite database and run migrations.
pub async fn init_db(path: &Path) -> Result<Database, sqlx::Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!(path = %path.display(), "opened local store");

    Ok(Database::new(pool))
}

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(value).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, sqlx::Error> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}
