//! Export the local store to a JSON file and import it back.

use std::path::{Path, PathBuf};

use crate::db::{Database, SnapshotRepository};
use crate::models::{CollectionCounts, Snapshot};

#[derive(Debug)]
pub enum BackupError {
    Io(PathBuf, std::io::Error),
    Format(PathBuf, serde_json::Error),
    Storage(sqlx::Error),
}

impl std::fmt::Display for BackupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupError::Io(path, e) => write!(f, "Backup file '{}': {}", path.display(), e),
            BackupError::Format(path, e) => {
                write!(f, "Backup file '{}' is not a valid snapshot: {}", path.display(), e)
            }
            BackupError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for BackupError {}

impl From<sqlx::Error> for BackupError {
    fn from(e: sqlx::Error) -> Self {
        BackupError::Storage(e)
    }
}

/// Writes the whole local store to `path` as pretty JSON.
pub async fn export_snapshot(db: &Database, path: &Path) -> Result<CollectionCounts, BackupError> {
    let snapshot = {
        let _all = db.lock_all().await;
        SnapshotRepository::new(db.clone()).load().await?
    };

    let json = snapshot
        .to_json_pretty()
        .map_err(|e| BackupError::Format(path.to_path_buf(), e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| BackupError::Io(parent.to_path_buf(), e))?;
    }
    std::fs::write(path, json).map_err(|e| BackupError::Io(path.to_path_buf(), e))?;

    tracing::info!(path = %path.display(), "exported snapshot");
    Ok(snapshot.counts())
}

/// Replaces the whole local store with the snapshot in `path`.
///
/// The file is fully parsed before anything local is touched.
pub async fn import_snapshot(db: &Database, path: &Path) -> Result<CollectionCounts, BackupError> {
    let json =
        std::fs::read_to_string(path).map_err(|e| BackupError::Io(path.to_path_buf(), e))?;
    let snapshot =
        Snapshot::from_json(&json).map_err(|e| BackupError::Format(path.to_path_buf(), e))?;

    {
        let _all = db.lock_all().await;
        SnapshotRepository::new(db.clone()).replace(&snapshot).await?;
    }

    tracing::info!(path = %path.display(), "imported snapshot");
    Ok(snapshot.counts())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use crate::db::test_support::setup_db;
    use crate::identity::IdentityStore;
    use crate::ledger::UsageLedger;
    use crate::models::User;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_export_then_import_into_fresh_store() {
        let source = setup_db().await;
        let identity = IdentityStore::new(source.db.clone());
        let ledger = UsageLedger::new(source.db.clone(), identity.clone());
        let ana = identity
            .register("Ana", "ana@example.com", "Sup3r-secret")
            .await
            .unwrap();
        let tr6 = ledger
            .create_vehicle("Triumph TR6", "Triumph", "TR6", ana.id)
            .await
            .unwrap();
        ledger
            .add_usage_day(tr6.id, ana.id, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await
            .unwrap();

        let dir = tempdir().unwrap();
        let file = dir.path().join("backups").join("ledger.json");
        let exported = export_snapshot(&source.db, &file).await.unwrap();
        assert_eq!(exported.users, 1);
        assert_eq!(exported.usage_days, 1);

        let target = setup_db().await;
        let imported = import_snapshot(&target.db, &file).await.unwrap();
        assert_eq!(imported, exported);

        let target_ledger = UsageLedger::new(target.db.clone(), IdentityStore::new(target.db.clone()));
        assert_eq!(target_ledger.count_usage_days(tr6.id).await.unwrap(), 1);
        // Credentials travel with the backup.
        IdentityStore::new(target.db.clone())
            .login("ana@example.com", "Sup3r-secret")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_import_invalid_file_keeps_local_data() {
        let ctx = setup_db().await;
        let identity = IdentityStore::new(ctx.db.clone());
        identity
            .register("Ana", "ana@example.com", "Sup3r-secret")
            .await
            .unwrap();

        let dir = tempdir().unwrap();
        let file = dir.path().join("broken.json");
        std::fs::write(&file, "{ not json").unwrap();

        let err = import_snapshot(&ctx.db, &file).await.unwrap_err();
        assert!(matches!(err, BackupError::Format(_, _)));
        assert_eq!(identity.list().await.unwrap().len(), 1);

        let missing = import_snapshot(&ctx.db, &dir.path().join("missing.json")).await;
        assert!(matches!(missing, Err(BackupError::Io(_, _))));
    }

    #[tokio::test]
    async fn test_imported_mixed_case_legacy_user_can_log_in() {
        let mut old = User::new(
            "Old Timer",
            "old@example.com",
            Credential::Legacy {
                password: "plain".to_string(),
            },
        );
        old.email = "Old@Example.COM".to_string();
        let snapshot = Snapshot {
            users: vec![old.clone()],
            ..Snapshot::empty()
        };

        let dir = tempdir().unwrap();
        let file = dir.path().join("legacy.json");
        std::fs::write(&file, snapshot.to_json_pretty().unwrap()).unwrap();

        let ctx = setup_db().await;
        import_snapshot(&ctx.db, &file).await.unwrap();

        let identity = IdentityStore::new(ctx.db.clone());
        let profile = identity.login("old@example.com", "plain").await.unwrap();
        assert_eq!(profile.id, old.id);
        assert_eq!(profile.email, "old@example.com");
    }
}
