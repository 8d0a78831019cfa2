//! Offline-first synchronization with a remote snapshot store.
//!
//! The local store is always written first and is always complete. A sync
//! run fetches the remote snapshot, merges it into the local one with
//! [`merge_snapshots`], commits the result locally and then pushes it back
//! if the remote accepts writes.

mod client;
mod merge;

pub use client::{SyncMode, SyncOutcome, SyncReport, SyncStatus, Synchronizer};
pub use merge::{merge_snapshots, MergeOutcome};
