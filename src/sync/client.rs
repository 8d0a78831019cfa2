//! The synchronizer: fetch, merge, commit locally, push.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::merge::merge_snapshots;
use crate::config::{RemoteConfig, DEFAULT_REMOTE_TIMEOUT_SECS};
use crate::db::{Database, MetaRepository, SnapshotRepository};
use crate::error::LedgerError;
use crate::models::{CollectionCounts, UsageDay};
use crate::remote::{self, Backend, RemoteError, RemotePort};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// No usable remote; all data stays on this device.
    LocalOnly,
    /// A remote with a write credential is configured.
    Synchronized,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::LocalOnly => write!(f, "local only"),
            SyncMode::Synchronized => write!(f, "synchronized"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Merged locally and pushed.
    Synchronized,
    /// Remote skipped or failed; whatever could be done locally was done.
    PartialLocal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub pulled: CollectionCounts,
    pub pushed: CollectionCounts,
    pub conflicts: Vec<UsageDay>,
    /// Why the outcome is partial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SyncReport {
    fn partial(reason: impl Into<String>) -> Self {
        Self {
            outcome: SyncOutcome::PartialLocal,
            pulled: CollectionCounts::default(),
            pushed: CollectionCounts::default(),
            conflicts: Vec::new(),
            reason: Some(reason.into()),
        }
    }

    pub fn is_synchronized(&self) -> bool {
        self.outcome == SyncOutcome::Synchronized
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub mode: SyncMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    pub writable: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

pub struct Synchronizer {
    db: Database,
    remote: Option<Arc<dyn RemotePort>>,
    timeout: Duration,
    credential_rejected: bool,
}

impl Synchronizer {
    pub fn new(db: Database, remote: Option<Arc<dyn RemotePort>>) -> Self {
        Self {
            db,
            remote,
            timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            credential_rejected: false,
        }
    }

    /// Builds the remote adapter from config. A broken remote config is
    /// logged and leaves the synchronizer local-only.
    pub fn from_config(db: Database, config: &RemoteConfig) -> Self {
        let remote = match remote::from_config(config) {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring remote configuration");
                None
            }
        };
        Self::new(db, remote).with_timeout(Duration::from_secs(config.timeout_secs.max(1)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn mode(&self) -> SyncMode {
        match &self.remote {
            Some(remote) if remote.is_writable() && !self.credential_rejected => {
                SyncMode::Synchronized
            }
            _ => SyncMode::LocalOnly,
        }
    }

    pub async fn status(&self) -> Result<SyncStatus, LedgerError> {
        let last_sync = MetaRepository::new(self.db.clone()).last_sync().await?;
        Ok(SyncStatus {
            mode: self.mode(),
            backend: self.remote.as_ref().map(|r| r.backend().to_string()),
            writable: self.mode() == SyncMode::Synchronized,
            last_sync,
        })
    }

    /// Reconciles the local store with the remote.
    ///
    /// Remote problems never surface as errors: they end the run with
    /// [`SyncOutcome::PartialLocal`]. If the remote could not be read,
    /// nothing local changes. Once read, the merged data is committed locally
    /// whether or not the push succeeds. Only a local storage failure is
    /// returned as `Err`.
    pub async fn sync(&mut self) -> Result<SyncReport, LedgerError> {
        let Some(remote) = self.remote.clone() else {
            return Ok(SyncReport::partial("no remote configured"));
        };
        let backend = remote.backend();

        let remote_snapshot = match self.call(remote.fetch_snapshot()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(%backend, error = %e, "remote fetch failed, staying local");
                self.note_rejection(&e);
                return Ok(SyncReport::partial(e.to_string()));
            }
        };

        let snapshots = SnapshotRepository::new(self.db.clone());
        let outcome = {
            let _all = self.db.lock_all().await;
            let local = snapshots.load().await?;
            let mut outcome = merge_snapshots(&remote_snapshot, &local);
            outcome.snapshot.last_sync = Some(Utc::now());
            snapshots.replace(&outcome.snapshot).await?;
            outcome
        };

        if !outcome.conflicts.is_empty() {
            tracing::warn!(
                %backend,
                conflicts = outcome.conflicts.len(),
                "dropped usage days already taken on another device"
            );
        }

        let mut report = SyncReport {
            outcome: SyncOutcome::PartialLocal,
            pulled: outcome.pulled,
            pushed: CollectionCounts::default(),
            conflicts: outcome.conflicts,
            reason: None,
        };

        if !remote.is_writable() {
            report.reason = Some(RemoteError::ReadOnly.to_string());
            tracing::info!(%backend, "pulled from read-only remote");
            return Ok(report);
        }

        match self.call(remote.put_snapshot(&outcome.snapshot)).await {
            Ok(()) => {
                self.credential_rejected = false;
                report.outcome = SyncOutcome::Synchronized;
                report.pushed = outcome.pushed;
                tracing::info!(
                    %backend,
                    pulled = report.pulled.total(),
                    pushed = report.pushed.total(),
                    "sync complete"
                );
            }
            Err(e) => {
                tracing::warn!(%backend, error = %e, "remote push failed, kept local merge");
                self.note_rejection(&e);
                report.reason = Some(e.to_string());
            }
        }

        Ok(report)
    }

    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, RemoteError>>,
    ) -> Result<T, RemoteError> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Unreachable(format!(
                "timed out after {}s",
                self.timeout.as_secs_f32()
            ))),
        }
    }

    fn note_rejection(&mut self, error: &RemoteError) {
        if matches!(error, RemoteError::Unauthorized) {
            self.credential_rejected = true;
        }
    }

    pub fn backend(&self) -> Option<Backend> {
        self.remote.as_ref().map(|r| r.backend())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use crate::db::test_support::{setup_db, TestDb};
    use crate::identity::IdentityStore;
    use crate::models::{Snapshot, User, Vehicle};
    use crate::remote::MemoryRemote;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn user(name: &str) -> User {
        User::new(
            name,
            format!("{}@example.com", name.to_lowercase()),
            Credential::from_password("pw"),
        )
    }

    async fn seed_local(ctx: &TestDb, snapshot: &Snapshot) {
        SnapshotRepository::new(ctx.db.clone())
            .replace(snapshot)
            .await
            .unwrap();
    }

    async fn load_local(ctx: &TestDb) -> Snapshot {
        SnapshotRepository::new(ctx.db.clone()).load().await.unwrap()
    }

    fn without_stamp(mut snapshot: Snapshot) -> Snapshot {
        snapshot.last_sync = None;
        snapshot
    }

    #[tokio::test]
    async fn test_remote_and_local_union() {
        let ctx = setup_db().await;
        let a = user("A");
        let b = user("B");
        let mut b_local = b.clone();
        b_local.name = "B offline".to_string();
        let c = user("C");

        seed_local(
            &ctx,
            &Snapshot {
                users: vec![b_local, c.clone()],
                ..Snapshot::empty()
            },
        )
        .await;
        let remote = Arc::new(MemoryRemote::with_snapshot(
            Snapshot {
                users: vec![a.clone(), b.clone()],
                ..Snapshot::empty()
            },
            true,
        ));

        let mut sync = Synchronizer::new(ctx.db.clone(), Some(remote.clone()));
        let report = sync.sync().await.unwrap();

        assert!(report.is_synchronized());
        assert_eq!(report.pulled.users, 2);
        assert_eq!(report.pushed.users, 1);

        let local = load_local(&ctx).await;
        assert_eq!(local.users, vec![a, b, c]);
        assert!(local.last_sync.is_some());
        assert_eq!(remote.snapshot().await.users, local.users);
    }

    #[tokio::test]
    async fn test_sync_twice_is_stable() {
        let ctx = setup_db().await;
        let owner = user("Owner");
        let vehicle = Vehicle::new("Triumph TR6", "Triumph", "TR6", owner.id);
        seed_local(
            &ctx,
            &Snapshot {
                users: vec![owner.clone()],
                vehicles: vec![vehicle.clone()],
                usage_days: vec![UsageDay::new(
                    vehicle.id,
                    owner.id,
                    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    "Owner",
                )],
                ..Snapshot::empty()
            },
        )
        .await;
        let remote = Arc::new(MemoryRemote::with_snapshot(
            Snapshot {
                users: vec![user("Remote")],
                ..Snapshot::empty()
            },
            true,
        ));

        let mut sync = Synchronizer::new(ctx.db.clone(), Some(remote));
        sync.sync().await.unwrap();
        let first = without_stamp(load_local(&ctx).await);

        let report = sync.sync().await.unwrap();
        let second = without_stamp(load_local(&ctx).await);

        assert_eq!(first, second);
        assert_eq!(report.pulled.total(), 0);
        assert_eq!(report.pushed.total(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_remote_changes_nothing() {
        let ctx = setup_db().await;
        let local = Snapshot {
            users: vec![user("Local")],
            ..Snapshot::empty()
        };
        seed_local(&ctx, &local).await;

        let remote = Arc::new(MemoryRemote::with_snapshot(
            Snapshot {
                users: vec![user("Remote")],
                ..Snapshot::empty()
            },
            true,
        ));
        remote.set_reachable(false);

        let mut sync = Synchronizer::new(ctx.db.clone(), Some(remote));
        let report = sync.sync().await.unwrap();

        assert_eq!(report.outcome, SyncOutcome::PartialLocal);
        assert!(report.reason.unwrap().contains("unreachable"));
        assert_eq!(load_local(&ctx).await, local);
    }

    #[tokio::test]
    async fn test_no_remote_is_local_only() {
        let ctx = setup_db().await;
        let mut sync = Synchronizer::new(ctx.db.clone(), None);

        assert_eq!(sync.mode(), SyncMode::LocalOnly);
        let report = sync.sync().await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::PartialLocal);

        let status = sync.status().await.unwrap();
        assert!(status.backend.is_none());
        assert!(status.last_sync.is_none());
    }

    #[tokio::test]
    async fn test_read_only_remote_still_commits_locally() {
        let ctx = setup_db().await;
        let remote_user = user("Remote");
        let remote = Arc::new(MemoryRemote::with_snapshot(
            Snapshot {
                users: vec![remote_user.clone()],
                ..Snapshot::empty()
            },
            false,
        ));

        let mut sync = Synchronizer::new(ctx.db.clone(), Some(remote.clone()));
        assert_eq!(sync.mode(), SyncMode::LocalOnly);

        let report = sync.sync().await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::PartialLocal);
        assert_eq!(report.pulled.users, 1);
        assert_eq!(load_local(&ctx).await.users, vec![remote_user]);
        assert_eq!(remote.put_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_push_keeps_merge_and_drops_to_local_only() {
        let ctx = setup_db().await;
        seed_local(
            &ctx,
            &Snapshot {
                users: vec![user("Local")],
                ..Snapshot::empty()
            },
        )
        .await;
        let remote_user = user("Remote");
        let remote = Arc::new(MemoryRemote::with_snapshot(
            Snapshot {
                users: vec![remote_user.clone()],
                ..Snapshot::empty()
            },
            true,
        ));
        remote.set_reject_writes(true);

        let mut sync = Synchronizer::new(ctx.db.clone(), Some(remote.clone()));
        assert_eq!(sync.mode(), SyncMode::Synchronized);

        let report = sync.sync().await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::PartialLocal);
        assert_eq!(report.pushed.total(), 0);
        assert_eq!(load_local(&ctx).await.users.len(), 2);
        assert_eq!(remote.snapshot().await.users, vec![remote_user]);
        assert_eq!(sync.mode(), SyncMode::LocalOnly);

        // A later successful push restores the synchronized mode.
        remote.set_reject_writes(false);
        assert!(sync.sync().await.unwrap().is_synchronized());
        assert_eq!(sync.mode(), SyncMode::Synchronized);
    }

    #[tokio::test]
    async fn test_conflicting_day_is_reported() {
        let ctx = setup_db().await;
        let vehicle_id = uuid::Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2024, 9, 9).unwrap();
        let theirs = UsageDay::new(vehicle_id, uuid::Uuid::new_v4(), day, "Ana");
        let mine = UsageDay::new(vehicle_id, uuid::Uuid::new_v4(), day, "Bo");

        seed_local(
            &ctx,
            &Snapshot {
                usage_days: vec![mine.clone()],
                ..Snapshot::empty()
            },
        )
        .await;
        let remote = Arc::new(MemoryRemote::with_snapshot(
            Snapshot {
                usage_days: vec![theirs.clone()],
                ..Snapshot::empty()
            },
            true,
        ));

        let mut sync = Synchronizer::new(ctx.db.clone(), Some(remote));
        let report = sync.sync().await.unwrap();

        assert!(report.is_synchronized());
        assert_eq!(report.conflicts, vec![mine]);
        assert_eq!(load_local(&ctx).await.usage_days, vec![theirs]);
    }

    #[tokio::test]
    async fn test_remote_repeating_an_id_still_syncs() {
        let ctx = setup_db().await;
        let ana = user("Ana");
        let remote = Arc::new(MemoryRemote::with_snapshot(
            Snapshot {
                users: vec![ana.clone(), ana.clone()],
                ..Snapshot::empty()
            },
            true,
        ));

        let mut sync = Synchronizer::new(ctx.db.clone(), Some(remote.clone()));
        let report = sync.sync().await.unwrap();

        assert!(report.is_synchronized());
        assert_eq!(load_local(&ctx).await.users, vec![ana.clone()]);
        assert_eq!(remote.snapshot().await.users, vec![ana]);

        // The repaired remote keeps syncing.
        assert!(sync.sync().await.unwrap().is_synchronized());
    }

    #[tokio::test]
    async fn test_mixed_case_remote_email_can_log_in() {
        let ctx = setup_db().await;
        let mut ana = User::new("Ana", "ana@example.com", Credential::from_password("Sup3r-secret"));
        ana.email = "Ana@Example.com".to_string();
        let remote = Arc::new(MemoryRemote::with_snapshot(
            Snapshot {
                users: vec![ana.clone()],
                ..Snapshot::empty()
            },
            true,
        ));

        let mut sync = Synchronizer::new(ctx.db.clone(), Some(remote.clone()));
        sync.sync().await.unwrap();

        let identity = IdentityStore::new(ctx.db.clone());
        let profile = identity.login("Ana@Example.com", "Sup3r-secret").await.unwrap();
        assert_eq!(profile.id, ana.id);
        assert_eq!(remote.snapshot().await.users[0].email, "ana@example.com");

        let report = sync.sync().await.unwrap();
        assert_eq!(report.pulled.users, 0);
    }

    struct StalledRemote;

    #[async_trait]
    impl RemotePort for StalledRemote {
        fn backend(&self) -> Backend {
            Backend::Memory
        }

        fn is_writable(&self) -> bool {
            true
        }

        async fn fetch_snapshot(&self) -> Result<Snapshot, RemoteError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Snapshot::empty())
        }

        async fn put_snapshot(&self, _snapshot: &Snapshot) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_timeout_counts_as_unreachable() {
        let ctx = setup_db().await;
        let local = Snapshot {
            users: vec![user("Local")],
            ..Snapshot::empty()
        };
        seed_local(&ctx, &local).await;

        let mut sync = Synchronizer::new(ctx.db.clone(), Some(Arc::new(StalledRemote)))
            .with_timeout(Duration::from_millis(50));
        let report = sync.sync().await.unwrap();

        assert_eq!(report.outcome, SyncOutcome::PartialLocal);
        assert!(report.reason.unwrap().contains("timed out"));
        assert_eq!(load_local(&ctx).await, local);
    }
}
