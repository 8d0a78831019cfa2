//! dayledger
//!
//! Usage-day ledger for historic vehicles: one logged day per vehicle per
//! calendar date, share codes for co-drivers, and offline-first sync of the
//! whole data set with a remote snapshot store.

pub mod backup;
pub mod config;
pub mod credential;
pub mod db;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod models;
pub mod remote;
pub mod server;
pub mod sharing;
pub mod sync;

pub use error::{LedgerError, Result};
pub use identity::IdentityStore;
pub use ledger::UsageLedger;
pub use models::{
    AccessibleVehicle, ShareGrant, Snapshot, UsageDay, UsageStatus, User, UserProfile, Vehicle,
};
pub use remote::{Backend, RemoteError, RemotePort};
pub use sharing::{share_message, ShareRegistry};
pub use sync::{merge_snapshots, SyncMode, SyncOutcome, SyncReport, Synchronizer};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
