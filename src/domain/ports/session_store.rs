/// Remote session store port (trait) for dependency injection.
///
/// The store tracks one pipeline run under a server-issued session id and
/// holds per-task results for crash recovery. All writes from the pipeline
/// are best-effort: failures are logged by callers, never surfaced.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ServiceError;
use crate::domain::models::SessionStatus;

/// Remote view of a session, as returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSessionStatus {
    pub status: SessionStatus,
    pub stock_code: String,
    /// Task ids the remote side has results for.
    #[serde(default)]
    pub completed_tasks: Vec<String>,
}

/// Remote session collaborator.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session record for a stock code.
    ///
    /// # Errors
    /// Returns `ServiceError` when the store is unreachable or rejects the
    /// request.
    async fn create(&self, stock_code: &str) -> Result<String, ServiceError>;

    /// Mark the session as running.
    async fn start(&self, session_id: &str) -> Result<(), ServiceError>;

    /// Persist one task's output. Must tolerate duplicate writes.
    async fn record_task_result(
        &self,
        session_id: &str,
        task_id: &str,
        output: &str,
    ) -> Result<(), ServiceError>;

    /// Move the session to a terminal status.
    async fn complete(&self, session_id: &str, status: SessionStatus) -> Result<(), ServiceError>;

    /// Query current status and the set of completed task ids.
    async fn status(&self, session_id: &str) -> Result<RemoteSessionStatus, ServiceError>;

    /// Pull one task's stored result. `None` when the remote side has no
    /// result for the task yet.
    async fn task_result(
        &self,
        session_id: &str,
        task_id: &str,
    ) -> Result<Option<String>, ServiceError>;
}
