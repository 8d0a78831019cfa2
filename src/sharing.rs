//! Share codes and the grants created by redeeming them.

use rand::Rng;
use uuid::Uuid;

use crate::db::{Database, ShareGrantRepository, VehicleRepository};
use crate::error::{LedgerError, Result};
use crate::models::{ShareGrant, Vehicle};

pub const SHARE_CODE_LENGTH: usize = 8;

const SHARE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Clone)]
pub struct ShareRegistry {
    db: Database,
}

impl ShareRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn vehicles(&self) -> VehicleRepository {
        VehicleRepository::new(self.db.clone())
    }

    fn grants(&self) -> ShareGrantRepository {
        ShareGrantRepository::new(self.db.clone())
    }

    /// Returns the vehicle's share code, assigning one on first request.
    ///
    /// The requester must own the vehicle or have redeemed its code.
    pub async fn share_vehicle(&self, vehicle_id: Uuid, requester_id: Uuid) -> Result<String> {
        let vehicles = self.vehicles();
        let _vehicles = self.db.locks().vehicles.lock().await;

        let vehicle = vehicles
            .get_by_id(vehicle_id)
            .await?
            .ok_or(LedgerError::VehicleNotFound(vehicle_id))?;

        if vehicle.owner_id != requester_id
            && !self
                .grants()
                .exists_for_vehicle_and_user(vehicle_id, requester_id)
                .await?
        {
            return Err(LedgerError::AccessDenied);
        }

        if let Some(code) = vehicle.share_code {
            return Ok(code);
        }

        let code = loop {
            let candidate = generate_share_code();
            if vehicles.get_by_share_code(&candidate).await?.is_none() {
                break candidate;
            }
        };
        vehicles.set_share_code(vehicle_id, &code).await?;

        tracing::info!(%vehicle_id, "assigned share code");
        Ok(code)
    }

    /// Grants `user_id` access to the vehicle carrying `code`.
    ///
    /// Returns `false` when the user had already redeemed this code.
    pub async fn redeem_code(&self, code: &str, user_id: Uuid) -> Result<bool> {
        let code = code.trim().to_uppercase();

        let vehicle = self
            .vehicles()
            .get_by_share_code(&code)
            .await?
            .ok_or_else(|| LedgerError::InvalidCode(code.clone()))?;
        let canonical = vehicle.share_code.unwrap_or(code);

        let grants = self.grants();
        let _grants = self.db.locks().share_grants.lock().await;

        if grants.find(&canonical, user_id).await?.is_some() {
            return Ok(false);
        }

        grants
            .create(&ShareGrant::new(vehicle.id, user_id, canonical))
            .await?;

        tracing::info!(vehicle_id = %vehicle.id, %user_id, "redeemed share code");
        Ok(true)
    }

    pub async fn list_shared_vehicles_for(&self, user_id: Uuid) -> Result<Vec<ShareGrant>> {
        Ok(self.grants().list_by_user(user_id).await?)
    }
}

/// Invitation text to send along with a share code.
pub fn share_message(vehicle: &Vehicle, code: &str) -> String {
    format!(
        "Hi! I'm sharing my historic vehicle '{}' with you so you can log usage days. \
         Sign in to dayledger and redeem this code to add it: {}",
        vehicle.name, code
    )
}

fn generate_share_code() -> String {
    let mut rng = rand::rng();
    (0..SHARE_CODE_LENGTH)
        .map(|_| SHARE_CODE_ALPHABET[rng.random_range(0..SHARE_CODE_ALPHABET.len())] as char)
        .collect()
}
