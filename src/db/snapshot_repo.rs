use super::meta_repo::{read_last_sync, write_last_sync};
use super::share_grant_repo::{insert_grant, list_grants};
use super::usage_day_repo::{insert_usage_day, list_usage_days};
use super::user_repo::{insert_user, list_users};
use super::vehicle_repo::{insert_vehicle, list_vehicles};
use super::Database;
use crate::models::{Snapshot, SNAPSHOT_VERSION};

/// Reads and writes the whole local store as one [`Snapshot`].
///
/// Callers are expected to hold [`Database::lock_all`] around a load that is
/// followed by a replace, so no single-record write slips in between.
pub struct SnapshotRepository {
    db: Database,
}

impl SnapshotRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Reads every collection in insertion order inside one transaction.
    pub async fn load(&self) -> Result<Snapshot, sqlx::Error> {
        let mut tx = self.db.pool().begin().await?;

        let users = list_users(&mut *tx).await?;
        let vehicles = list_vehicles(&mut *tx).await?;
        let usage_days = list_usage_days(&mut *tx).await?;
        let share_grants = list_grants(&mut *tx).await?;
        let last_sync = read_last_sync(&mut *tx).await?;

        tx.commit().await?;

        Ok(Snapshot {
            users,
            vehicles,
            usage_days,
            share_grants,
            last_sync,
            version: SNAPSHOT_VERSION.to_string(),
        })
    }

    /// Replaces every collection with the snapshot's contents. Either all of
    /// it lands or none of it does.
    pub async fn replace(&self, snapshot: &Snapshot) -> Result<(), sqlx::Error> {
        let mut tx = self.db.pool().begin().await?;

        for table in ["share_grants", "usage_days", "vehicles", "users"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }

        for user in &snapshot.users {
            insert_user(&mut *tx, user).await?;
        }
        for vehicle in &snapshot.vehicles {
            insert_vehicle(&mut *tx, vehicle).await?;
        }
        for day in &snapshot.usage_days {
            insert_usage_day(&mut *tx, day).await?;
        }
        for grant in &snapshot.share_grants {
            insert_grant(&mut *tx, grant).await?;
        }
        write_last_sync(&mut *tx, snapshot.last_sync).await?;

        tx.commit().await?;

        tracing::debug!(
            users = snapshot.users.len(),
            vehicles = snapshot.vehicles.len(),
            usage_days = snapshot.usage_days.len(),
            share_grants = snapshot.share_grants.len(),
            "replaced local store"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use crate::db::test_support::setup_db;
    use crate::db::{UsageDayRepository, UserRepository};
    use crate::models::{ShareGrant, UsageDay, User, Vehicle};
    use chrono::{NaiveDate, Utc};

    fn sample_snapshot() -> Snapshot {
        let owner = User::new("Ana", "ana@example.com", Credential::from_password("pw"));
        let vehicle = Vehicle::new("Triumph TR6", "Triumph", "TR6", owner.id);
        let day = UsageDay::new(
            vehicle.id,
            owner.id,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Ana",
        );
        let grant = ShareGrant::new(vehicle.id, owner.id, "AB12CD34");

        Snapshot {
            users: vec![owner],
            vehicles: vec![vehicle],
            usage_days: vec![day],
            share_grants: vec![grant],
            last_sync: Some(Utc::now()),
            ..Snapshot::empty()
        }
    }

    #[tokio::test]
    async fn test_empty_store_loads_empty_snapshot() {
        let ctx = setup_db().await;
        let repo = SnapshotRepository::new(ctx.db.clone());

        let snapshot = repo.load().await.unwrap();
        assert!(snapshot.is_empty());
        assert!(snapshot.last_sync.is_none());
        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
    }

    #[tokio::test]
    async fn test_replace_then_load_returns_same_records() {
        let ctx = setup_db().await;
        let repo = SnapshotRepository::new(ctx.db.clone());
        let snapshot = sample_snapshot();

        repo.replace(&snapshot).await.unwrap();
        let loaded = repo.load().await.unwrap();

        assert_eq!(loaded.users, snapshot.users);
        assert_eq!(loaded.vehicles, snapshot.vehicles);
        assert_eq!(loaded.usage_days, snapshot.usage_days);
        assert_eq!(loaded.share_grants, snapshot.share_grants);
        assert_eq!(
            loaded.last_sync.map(|t| t.timestamp()),
            snapshot.last_sync.map(|t| t.timestamp())
        );
    }

    #[tokio::test]
    async fn test_replace_discards_previous_rows() {
        let ctx = setup_db().await;
        let repo = SnapshotRepository::new(ctx.db.clone());
        let users = UserRepository::new(ctx.db.clone());

        let stale = User::new("Stale", "stale@example.com", Credential::from_password("pw"));
        users.create(&stale).await.unwrap();

        repo.replace(&sample_snapshot()).await.unwrap();

        assert!(users.get_by_id(stale.id).await.unwrap().is_none());
        assert_eq!(users.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_replace_leaves_store_untouched() {
        let ctx = setup_db().await;
        let repo = SnapshotRepository::new(ctx.db.clone());
        let original = sample_snapshot();
        repo.replace(&original).await.unwrap();

        // Two records for the same vehicle and date trip the unique index.
        let mut broken = sample_snapshot();
        let mut clash = broken.usage_days[0].clone();
        clash.id = uuid::Uuid::new_v4();
        broken.usage_days.push(clash);
        assert!(repo.replace(&broken).await.is_err());

        let days = UsageDayRepository::new(ctx.db.clone());
        let vehicle_id = original.vehicles[0].id;
        assert_eq!(days.count_by_vehicle(vehicle_id).await.unwrap(), 1);
        assert_eq!(repo.load().await.unwrap().users, original.users);
    }
}
