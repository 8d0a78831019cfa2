use chrono::NaiveDate;
use sqlx::SqliteExecutor;
use uuid::Uuid;

use super::{parse_date, parse_timestamp, parse_uuid, Database};
use crate::models::UsageDay;

pub struct UsageDayRepository {
    db: Database,
}

#[derive(sqlx::FromRow)]
struct UsageDayRow {
    id: String,
    vehicle_id: String,
    user_id: String,
    date: String,
    user_name: String,
    created_at: String,
}

impl UsageDayRow {
    fn into_usage_day(self) -> Result<UsageDay, sqlx::Error> {
        Ok(UsageDay {
            id: parse_uuid(&self.id)?,
            vehicle_id: parse_uuid(&self.vehicle_id)?,
            user_id: parse_uuid(&self.user_id)?,
            date: parse_date(&self.date)?,
            user_name: self.user_name,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub(crate) async fn insert_usage_day<'e, E>(executor: E, day: &UsageDay) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO usage_days (id, vehicle_id, user_id, date, user_name, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(day.id.to_string())
    .bind(day.vehicle_id.to_string())
    .bind(day.user_id.to_string())
    .bind(day.date.to_string())
    .bind(&day.user_name)
    .bind(day.created_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_usage_days<'e, E>(executor: E) -> Result<Vec<UsageDay>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<UsageDayRow> = sqlx::query_as("SELECT * FROM usage_days ORDER BY rowid")
        .fetch_all(executor)
        .await?;

    rows.into_iter().map(UsageDayRow::into_usage_day).collect()
}

impl UsageDayRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, day: &UsageDay) -> Result<(), sqlx::Error> {
        insert_usage_day(self.db.pool(), day).await
    }

    pub async fn find_by_vehicle_and_date(
        &self,
        vehicle_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<UsageDay>, sqlx::Error> {
        let row: Option<UsageDayRow> =
            sqlx::query_as("SELECT * FROM usage_days WHERE vehicle_id = ? AND date = ?")
                .bind(vehicle_id.to_string())
                .bind(date.to_string())
                .fetch_optional(self.db.pool())
                .await?;

        row.map(UsageDayRow::into_usage_day).transpose()
    }

    /// Usage days for a vehicle, newest date first.
    pub async fn list_by_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<UsageDay>, sqlx::Error> {
        let rows: Vec<UsageDayRow> = sqlx::query_as(
            "SELECT * FROM usage_days WHERE vehicle_id = ? ORDER BY date DESC, rowid",
        )
        .bind(vehicle_id.to_string())
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(UsageDayRow::into_usage_day).collect()
    }

    pub async fn count_by_vehicle(&self, vehicle_id: Uuid) -> Result<u32, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM usage_days WHERE vehicle_id = ?")
                .bind(vehicle_id.to_string())
                .fetch_one(self.db.pool())
                .await?;

        Ok(count as u32)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM usage_days WHERE id = ?")
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Removes every usage day of a vehicle; returns how many were removed.
    pub async fn delete_by_vehicle(&self, vehicle_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM usage_days WHERE vehicle_id = ?")
            .bind(vehicle_id.to_string())
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
