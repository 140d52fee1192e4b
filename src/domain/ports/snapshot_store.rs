/// Local snapshot store port (trait) for dependency injection.
///
/// Holds an opaque versioned blob per session plus a current-session-id
/// pointer. Restores must ignore unknown fields (forward compatibility).
use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Snapshot;

/// Local persistent storage for run snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a snapshot, overwriting any previous one for the session.
    async fn save(&self, snapshot: &Snapshot) -> DomainResult<()>;

    /// Load the snapshot for a session, if one exists.
    async fn load(&self, session_id: &str) -> DomainResult<Option<Snapshot>>;

    /// Remove the snapshot for a session. Removing a missing snapshot is
    /// not an error.
    async fn clear(&self, session_id: &str) -> DomainResult<()>;

    /// Point the store at the session currently in progress.
    async fn set_current(&self, session_id: &str) -> DomainResult<()>;

    /// The session id most recently set as current, if any.
    async fn current(&self) -> DomainResult<Option<String>>;

    /// Drop the current-session pointer.
    async fn clear_current(&self) -> DomainResult<()>;
}
