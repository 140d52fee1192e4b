//! File-backed snapshot store.
//!
//! Layout under the configured directory:
//!   current_session        - plain-text pointer to the in-progress session
//!   session-<id>.json      - versioned snapshot blob per session
//!
//! Restores are forward compatible: unknown fields in a blob are ignored.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Snapshot;
use crate::domain::ports::SnapshotStore;

const POINTER_FILE: &str = "current_session";

pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn blob_path(&self, session_id: &str) -> PathBuf {
        // Session ids are server-issued; strip path separators anyway.
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("session-{safe}.json"))
    }

    fn pointer_path(&self) -> PathBuf {
        self.dir.join(POINTER_FILE)
    }

    async fn ensure_dir(&self) -> DomainResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| DomainError::Persistence(err.to_string()))
    }
}

async fn remove_if_exists(path: &Path) -> DomainResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(DomainError::Persistence(err.to_string())),
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, snapshot: &Snapshot) -> DomainResult<()> {
        self.ensure_dir().await?;
        let json = serde_json::to_vec_pretty(snapshot)?;
        fs::write(self.blob_path(&snapshot.session.id), json)
            .await
            .map_err(|err| DomainError::Persistence(err.to_string()))
    }

    async fn load(&self, session_id: &str) -> DomainResult<Option<Snapshot>> {
        match fs::read(self.blob_path(session_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DomainError::Persistence(err.to_string())),
        }
    }

    async fn clear(&self, session_id: &str) -> DomainResult<()> {
        remove_if_exists(&self.blob_path(session_id)).await
    }

    async fn set_current(&self, session_id: &str) -> DomainResult<()> {
        self.ensure_dir().await?;
        fs::write(self.pointer_path(), session_id)
            .await
            .map_err(|err| DomainError::Persistence(err.to_string()))
    }

    async fn current(&self) -> DomainResult<Option<String>> {
        match fs::read_to_string(self.pointer_path()).await {
            Ok(id) => {
                let id = id.trim().to_string();
                Ok(if id.is_empty() { None } else { Some(id) })
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(DomainError::Persistence(err.to_string())),
        }
    }

    async fn clear_current(&self) -> DomainResult<()> {
        remove_if_exists(&self.pointer_path()).await
    }
}
