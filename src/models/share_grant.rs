use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Record that a user redeemed a vehicle's share code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareGrant {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub share_code: String,
    pub created_at: DateTime<Utc>,
}

impl ShareGrant {
    pub fn new(vehicle_id: Uuid, user_id: Uuid, share_code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            user_id,
            share_code: share_code.into(),
            created_at: Utc::now(),
        }
    }
}
