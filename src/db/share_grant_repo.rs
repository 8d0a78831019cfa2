use sqlx::SqliteExecutor;
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Database};
use crate::models::ShareGrant;

pub struct ShareGrantRepository {
    db: Database,
}

#[derive(sqlx::FromRow)]
struct ShareGrantRow {
    id: String,
    vehicle_id: String,
    user_id: String,
    share_code: String,
    created_at: String,
}

impl ShareGrantRow {
    fn into_grant(self) -> Result<ShareGrant, sqlx::Error> {
        Ok(ShareGrant {
            id: parse_uuid(&self.id)?,
            vehicle_id: parse_uuid(&self.vehicle_id)?,
            user_id: parse_uuid(&self.user_id)?,
            share_code: self.share_code,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub(crate) async fn insert_grant<'e, E>(executor: E, grant: &ShareGrant) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO share_grants (id, vehicle_id, user_id, share_code, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(grant.id.to_string())
    .bind(grant.vehicle_id.to_string())
    .bind(grant.user_id.to_string())
    .bind(&grant.share_code)
    .bind(grant.created_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_grants<'e, E>(executor: E) -> Result<Vec<ShareGrant>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<ShareGrantRow> = sqlx::query_as("SELECT * FROM share_grants ORDER BY rowid")
        .fetch_all(executor)
        .await?;

    rows.into_iter().map(ShareGrantRow::into_grant).collect()
}

impl ShareGrantRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, grant: &ShareGrant) -> Result<(), sqlx::Error> {
        insert_grant(self.db.pool(), grant).await
    }

    pub async fn find(&self, code: &str, user_id: Uuid) -> Result<Option<ShareGrant>, sqlx::Error> {
        let row: Option<ShareGrantRow> = sqlx::query_as(
            "SELECT * FROM share_grants WHERE share_code = ? COLLATE NOCASE AND user_id = ? LIMIT 1",
        )
        .bind(code.trim())
        .bind(user_id.to_string())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(ShareGrantRow::into_grant).transpose()
    }

    pub async fn exists_for_vehicle_and_user(
        &self,
        vehicle_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM share_grants WHERE vehicle_id = ? AND user_id = ?",
        )
        .bind(vehicle_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(self.db.pool())
        .await?;

        Ok(count > 0)
    }

    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ShareGrant>, sqlx::Error> {
        let rows: Vec<ShareGrantRow> =
            sqlx::query_as("SELECT * FROM share_grants WHERE user_id = ? ORDER BY rowid")
                .bind(user_id.to_string())
                .fetch_all(self.db.pool())
                .await?;

        rows.into_iter().map(ShareGrantRow::into_grant).collect()
    }

    pub async fn delete_by_vehicle(&self, vehicle_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM share_grants WHERE vehicle_id = ?")
            .bind(vehicle_id.to_string())
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
