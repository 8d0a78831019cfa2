//! The usage-day ledger: one record per vehicle per calendar day.

use uuid::Uuid;

use crate::db::{Database, ShareGrantRepository, UsageDayRepository, VehicleRepository};
use crate::error::{LedgerError, Result};
use crate::identity::IdentityStore;
use crate::models::{AccessibleVehicle, CalendarDate, UsageDay, UsageStatus, Vehicle};

#[derive(Clone)]
pub struct UsageLedger {
    db: Database,
    identity: IdentityStore,
}

impl UsageLedger {
    pub fn new(db: Database, identity: IdentityStore) -> Self {
        Self { db, identity }
    }

    fn vehicles(&self) -> VehicleRepository {
        VehicleRepository::new(self.db.clone())
    }

    fn days(&self) -> UsageDayRepository {
        UsageDayRepository::new(self.db.clone())
    }

    fn grants(&self) -> ShareGrantRepository {
        ShareGrantRepository::new(self.db.clone())
    }

    pub async fn count_usage_days(&self, vehicle_id: Uuid) -> Result<u32> {
        Ok(self.days().count_by_vehicle(vehicle_id).await?)
    }

    /// Usage days for a vehicle, newest date first.
    pub async fn list_usage_days(&self, vehicle_id: Uuid) -> Result<Vec<UsageDay>> {
        Ok(self.days().list_by_vehicle(vehicle_id).await?)
    }

    /// Logs `date` as a usage day of the vehicle, attributed to `user_id`.
    ///
    /// Only the calendar date of `date` is kept. A day that is already logged
    /// fails with `DuplicateEntry` when the same user logged it and with
    /// `DateOccupied` when someone else did.
    pub async fn add_usage_day(
        &self,
        vehicle_id: Uuid,
        user_id: Uuid,
        date: impl CalendarDate,
    ) -> Result<UsageDay> {
        let date = date.calendar_date();
        let user_name = self.identity.resolve_name(user_id).await?;

        let _vehicles = self.db.locks().vehicles.lock().await;
        let _days = self.db.locks().usage_days.lock().await;

        if self.vehicles().get_by_id(vehicle_id).await?.is_none() {
            return Err(LedgerError::VehicleNotFound(vehicle_id));
        }

        let days = self.days();
        if let Some(existing) = days.find_by_vehicle_and_date(vehicle_id, date).await? {
            return Err(if existing.user_id == user_id {
                LedgerError::DuplicateEntry { date }
            } else {
                LedgerError::DateOccupied {
                    date,
                    user_name: existing.user_name,
                }
            });
        }

        let day = UsageDay::new(vehicle_id, user_id, date, user_name);
        days.create(&day).await?;

        tracing::debug!(%vehicle_id, %date, "logged usage day");
        Ok(day)
    }

    /// Deletes a usage day. Deleting one that does not exist is not an error.
    pub async fn remove_usage_day(&self, usage_day_id: Uuid) -> Result<()> {
        let _days = self.db.locks().usage_days.lock().await;
        self.days().delete(usage_day_id).await?;
        Ok(())
    }

    pub async fn usage_status(&self, vehicle_id: Uuid) -> Result<UsageStatus> {
        let count = self.count_usage_days(vehicle_id).await?;
        Ok(UsageStatus::from_count(count))
    }

    pub async fn create_vehicle(
        &self,
        name: &str,
        make: &str,
        model: &str,
        owner_id: Uuid,
    ) -> Result<Vehicle> {
        if self.identity.get(owner_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(owner_id));
        }

        let vehicle = Vehicle::new(name.trim(), make.trim(), model.trim(), owner_id);

        let _vehicles = self.db.locks().vehicles.lock().await;
        self.vehicles().create(&vehicle).await?;

        tracing::info!(vehicle_id = %vehicle.id, "created vehicle");
        Ok(vehicle)
    }

    pub async fn get_vehicle(&self, vehicle_id: Uuid) -> Result<Vehicle> {
        self.vehicles()
            .get_by_id(vehicle_id)
            .await?
            .ok_or(LedgerError::VehicleNotFound(vehicle_id))
    }

    /// Deletes a vehicle together with its usage days and share grants.
    pub async fn delete_vehicle(&self, vehicle_id: Uuid) -> Result<()> {
        let _vehicles = self.db.locks().vehicles.lock().await;
        let _days = self.db.locks().usage_days.lock().await;
        let _grants = self.db.locks().share_grants.lock().await;

        let vehicles = self.vehicles();
        if vehicles.get_by_id(vehicle_id).await?.is_none() {
            return Err(LedgerError::VehicleNotFound(vehicle_id));
        }

        let removed_days = self.days().delete_by_vehicle(vehicle_id).await?;
        let removed_grants = self.grants().delete_by_vehicle(vehicle_id).await?;
        vehicles.delete(vehicle_id).await?;

        tracing::info!(
            %vehicle_id,
            removed_days,
            removed_grants,
            "deleted vehicle"
        );
        Ok(())
    }

    /// Vehicles the user owns, followed by vehicles reached through redeemed
    /// share codes.
    pub async fn vehicles_for_user(&self, user_id: Uuid) -> Result<Vec<AccessibleVehicle>> {
        let vehicles = self.vehicles();

        let mut accessible: Vec<AccessibleVehicle> = vehicles
            .list_by_owner(user_id)
            .await?
            .into_iter()
            .map(|vehicle| AccessibleVehicle {
                vehicle,
                shared_with_me: false,
            })
            .collect();

        for grant in self.grants().list_by_user(user_id).await? {
            if accessible.iter().any(|a| a.vehicle.id == grant.vehicle_id) {
                continue;
            }
            // A grant can outlive its vehicle until the next sync cleans up.
            if let Some(vehicle) = vehicles.get_by_id(grant.vehicle_id).await? {
                accessible.push(AccessibleVehicle {
                    vehicle,
                    shared_with_me: true,
                });
            }
        }

        Ok(accessible)
    }
}
