//! The full data set exchanged between the local store and a remote.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ShareGrant, UsageDay, User, Vehicle};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// All users, vehicles, usage days and share grants at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
    #[serde(default)]
    pub usage_days: Vec<UsageDay>,
    #[serde(default)]
    pub share_grants: Vec<ShareGrant>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    SNAPSHOT_VERSION.to_string()
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            users: Vec::new(),
            vehicles: Vec::new(),
            usage_days: Vec::new(),
            share_grants: Vec::new(),
            last_sync: None,
            version: default_version(),
        }
    }

    pub fn counts(&self) -> CollectionCounts {
        CollectionCounts {
            users: self.users.len(),
            vehicles: self.vehicles.len(),
            usage_days: self.usage_days.len(),
            share_grants: self.share_grants.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    /// Pretty JSON, as written to backup files and remote blobs.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Per-collection record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CollectionCounts {
    pub users: usize,
    pub vehicles: usize,
    pub usage_days: usize,
    pub share_grants: usize,
}

impl CollectionCounts {
    pub fn total(&self) -> usize {
        self.users + self.vehicles + self.usage_days + self.share_grants
    }
}

/// Records that carry a stable identifier.
pub trait Identified {
    fn id(&self) -> Uuid;
}

impl Identified for User {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identified for Vehicle {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identified for UsageDay {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Identified for ShareGrant {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use chrono::NaiveDate;

    fn sample() -> Snapshot {
        let user = User::new("Ana", "ana@example.com", Credential::from_password("pw"));
        let vehicle = Vehicle::new("Triumph TR6", "Triumph", "TR6", user.id);
        let day = UsageDay::new(
            vehicle.id,
            user.id,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            "Ana",
        );
        let grant = ShareGrant::new(vehicle.id, Uuid::new_v4(), "AB12CD34");

        Snapshot {
            users: vec![user],
            vehicles: vec![vehicle],
            usage_days: vec![day],
            share_grants: vec![grant],
            last_sync: Some(Utc::now()),
            version: SNAPSHOT_VERSION.to_string(),
        }
    }

    #[test]
    fn test_snapshot_json_is_lossless() {
        let snapshot = sample();

        let json = snapshot.to_json_pretty().unwrap();
        let parsed = Snapshot::from_json(&json).unwrap();

        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_snapshot_tolerates_missing_collections() {
        let parsed = Snapshot::from_json(r#"{"users": []}"#).unwrap();

        assert!(parsed.is_empty());
        assert_eq!(parsed.version, SNAPSHOT_VERSION);
        assert!(parsed.last_sync.is_none());
    }

    #[test]
    fn test_counts() {
        let counts = sample().counts();
        assert_eq!(counts.users, 1);
        assert_eq!(counts.total(), 4);
    }
}
