//! In-process remote, for tests and offline demos.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::{Backend, RemotePort, RemoteError};
use crate::models::Snapshot;

#[derive(Debug)]
pub struct MemoryRemote {
    snapshot: Mutex<Snapshot>,
    writable: bool,
    reachable: AtomicBool,
    reject_writes: AtomicBool,
    puts: AtomicUsize,
}

impl MemoryRemote {
    pub fn new(writable: bool) -> Self {
        Self::with_snapshot(Snapshot::empty(), writable)
    }

    pub fn with_snapshot(snapshot: Snapshot, writable: bool) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            writable,
            reachable: AtomicBool::new(true),
            reject_writes: AtomicBool::new(false),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes subsequent writes fail as if the credential were revoked.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().await.clone()
    }

    /// Number of successful writes.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), RemoteError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unreachable("memory remote is offline".to_string()))
        }
    }
}

#[async_trait]
impl RemotePort for MemoryRemote {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, RemoteError> {
        self.check_reachable()?;
        Ok(self.snapshot.lock().await.clone())
    }

    async fn put_snapshot(&self, snapshot: &Snapshot) -> Result<(), RemoteError> {
        self.check_reachable()?;
        if !self.writable {
            return Err(RemoteError::ReadOnly);
        }
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Unauthorized);
        }

        *self.snapshot.lock().await = snapshot.clone();
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
