//! Server-side snapshot storage.
//!
//! The server keeps exactly one snapshot:
//! ```text
//! <DATA_DIR>/
//!   snapshot.json
//! ```

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::models::Snapshot;

const SNAPSHOT_FILE: &str = "snapshot.json";

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error reading or writing a file.
    IoError(PathBuf, io::Error),
    /// The stored file is not a valid snapshot.
    Corrupt(PathBuf, serde_json::Error),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::Corrupt(path, e) => {
                write!(f, "Stored snapshot {} is unreadable: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::Corrupt(_, e) => Some(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    data_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }

    /// Returns `Ok(None)` until the first snapshot is saved.
    pub fn load(&self) -> Result<Option<Snapshot>, ServerStorageError> {
        let path = self.snapshot_path();

        match fs::read_to_string(&path) {
            Ok(json) => Snapshot::from_json(&json)
                .map(Some)
                .map_err(|e| ServerStorageError::Corrupt(path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServerStorageError::IoError(path, e)),
        }
    }

    /// Replaces the stored snapshot.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), ServerStorageError> {
        let path = self.snapshot_path();

        fs::create_dir_all(&self.data_dir)
            .map_err(|e| ServerStorageError::IoError(self.data_dir.clone(), e))?;

        let json = snapshot
            .to_json_pretty()
            .map_err(|e| ServerStorageError::Corrupt(path.clone(), e))?;

        // Write atomically using temp file + rename
        let temp_path = path.with_extension("json.tmp");

        let mut file = File::create(&temp_path)
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;

        file.write_all(json.as_bytes())
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;

        file.sync_all()
            .map_err(|e| ServerStorageError::IoError(temp_path.clone(), e))?;

        fs::rename(&temp_path, &path).map_err(|e| ServerStorageError::IoError(path, e))?;

        Ok(())
    }
}
