mod share_grant;
mod snapshot;
mod usage_day;
mod user;
mod vehicle;

pub use share_grant::ShareGrant;
pub use snapshot::{CollectionCounts, Identified, Snapshot, SNAPSHOT_VERSION};
pub use usage_day::{CalendarDate, UsageDay, UsageStatus, LIMIT_THRESHOLD, WARNING_THRESHOLD};
pub use user::{normalize_email, User, UserProfile};
pub use vehicle::{AccessibleVehicle, Vehicle};
