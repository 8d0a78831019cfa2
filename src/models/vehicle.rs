use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub name: String,
    pub make: String,
    pub model: String,
    pub owner_id: Uuid,
    pub shared: bool,
    pub share_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn new(
        name: impl Into<String>,
        make: impl Into<String>,
        model: impl Into<String>,
        owner_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            make: make.into(),
            model: model.into(),
            owner_id,
            shared: false,
            share_code: None,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.make, self.model)
    }
}

/// A vehicle as seen by one user: either owned, or reached through a share code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessibleVehicle {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub shared_with_me: bool,
}
