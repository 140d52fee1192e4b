//! Session domain model.
//!
//! A session is the externally tracked identity of one pipeline run. Its id
//! is immutable for the run's lifetime.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Created,
    Running,
    Completed,
    Error,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::Created
    }
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "created" => Some(Self::Created),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "error" | "failed" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// One pipeline run as tracked locally and mirrored remotely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub stock_code: String,
    pub started_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Task ids that have reached `Success` in this run.
    #[serde(default)]
    pub completed_tasks: BTreeSet<String>,
}

impl Session {
    pub fn new(id: impl Into<String>, stock_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            stock_code: stock_code.into(),
            started_at: Utc::now(),
            status: SessionStatus::Created,
            completed_tasks: BTreeSet::new(),
        }
    }

    /// Record a completed task id. Returns false if it was already recorded.
    pub fn record_completed(&mut self, task_id: impl Into<String>) -> bool {
        self.completed_tasks.insert(task_id.into())
    }
}
