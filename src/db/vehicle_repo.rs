use sqlx::SqliteExecutor;
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Database};
use crate::models::Vehicle;

pub struct VehicleRepository {
    db: Database,
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: String,
    name: String,
    make: String,
    model: String,
    owner_id: String,
    shared: bool,
    share_code: Option<String>,
    created_at: String,
}

impl VehicleRow {
    fn into_vehicle(self) -> Result<Vehicle, sqlx::Error> {
        Ok(Vehicle {
            id: parse_uuid(&self.id)?,
            name: self.name,
            make: self.make,
            model: self.model,
            owner_id: parse_uuid(&self.owner_id)?,
            shared: self.shared,
            share_code: self.share_code,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub(crate) async fn insert_vehicle<'e, E>(executor: E, vehicle: &Vehicle) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO vehicles (id, name, make, model, owner_id, shared, share_code, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(vehicle.id.to_string())
    .bind(&vehicle.name)
    .bind(&vehicle.make)
    .bind(&vehicle.model)
    .bind(vehicle.owner_id.to_string())
    .bind(vehicle.shared)
    .bind(&vehicle.share_code)
    .bind(vehicle.created_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn list_vehicles<'e, E>(executor: E) -> Result<Vec<Vehicle>, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let rows: Vec<VehicleRow> = sqlx::query_as("SELECT * FROM vehicles ORDER BY rowid")
        .fetch_all(executor)
        .await?;

    rows.into_iter().map(VehicleRow::into_vehicle).collect()
}

impl VehicleRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, vehicle: &Vehicle) -> Result<(), sqlx::Error> {
        insert_vehicle(self.db.pool(), vehicle).await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Vehicle>, sqlx::Error> {
        let row: Option<VehicleRow> = sqlx::query_as("SELECT * FROM vehicles WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(self.db.pool())
            .await?;

        row.map(VehicleRow::into_vehicle).transpose()
    }

    /// Finds the vehicle carrying a share code, ignoring case.
    pub async fn get_by_share_code(&self, code: &str) -> Result<Option<Vehicle>, sqlx::Error> {
        let row: Option<VehicleRow> = sqlx::query_as(
            "SELECT * FROM vehicles WHERE share_code = ? COLLATE NOCASE ORDER BY rowid LIMIT 1",
        )
        .bind(code.trim())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(VehicleRow::into_vehicle).transpose()
    }

    pub async fn list(&self) -> Result<Vec<Vehicle>, sqlx::Error> {
        list_vehicles(self.db.pool()).await
    }

    pub async fn list_by_owner(&self, owner_id: Uuid) -> Result<Vec<Vehicle>, sqlx::Error> {
        let rows: Vec<VehicleRow> =
            sqlx::query_as("SELECT * FROM vehicles WHERE owner_id = ? ORDER BY name, rowid")
                .bind(owner_id.to_string())
                .fetch_all(self.db.pool())
                .await?;

        rows.into_iter().map(VehicleRow::into_vehicle).collect()
    }

    /// Marks the vehicle as shared under `code`.
    pub async fn set_share_code(&self, id: Uuid, code: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE vehicles SET shared = 1, share_code = ? WHERE id = ?")
            .bind(code)
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM vehicles WHERE id = ?")
            .bind(id.to_string())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }
}
