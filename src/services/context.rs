//! Run-scoped shared state.
//!
//! One `RunContext` exists per pipeline run and is passed by `Arc` into every
//! concurrent task unit; there are no ambient singletons. Each task owns its
//! own key in the task map, so concurrent writers never collide on a key.
//! Anything embedded into an outgoing request is a point-in-time copy.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    estimate_tokens, AnalysisTask, Citation, DebateConclusion, MarketSnapshot, ProgressEntry,
    Session, SessionStatus, Snapshot, TaskState, SNAPSHOT_VERSION,
};
use crate::services::events::{emit, EventSender, RunEvent};
use crate::services::registry::TaskRegistry;

/// Shared mutable state for one pipeline run.
pub struct RunContext {
    pub session_id: String,
    pub stock_code: String,
    pub market: MarketSnapshot,
    started_at: DateTime<Utc>,
    status: RwLock<SessionStatus>,
    tasks: RwLock<BTreeMap<String, AnalysisTask>>,
    conclusions: RwLock<Vec<DebateConclusion>>,
    events: EventSender,
}

impl RunContext {
    /// Create a fresh context with every catalogue task reset to `Idle`.
    pub fn new(
        session_id: impl Into<String>,
        stock_code: impl Into<String>,
        market: MarketSnapshot,
        events: EventSender,
    ) -> Self {
        let tasks = TaskRegistry::specs()
            .iter()
            .map(|spec| {
                (
                    spec.id.to_string(),
                    AnalysisTask::new(spec.id, spec.title, spec.stage, spec.step, spec.group),
                )
            })
            .collect();
        Self {
            session_id: session_id.into(),
            stock_code: stock_code.into(),
            market,
            started_at: Utc::now(),
            status: RwLock::new(SessionStatus::Created),
            tasks: RwLock::new(tasks),
            conclusions: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Best-effort event emission.
    pub fn emit(&self, event: RunEvent) {
        emit(&self.events, event);
    }

    /// Clone of the event sender, for components that emit on their own.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        *self.status.read().await
    }

    pub async fn set_status(&self, status: SessionStatus) {
        *self.status.write().await = status;
    }

    /// Clone of one task's current state.
    pub async fn task(&self, task_id: &str) -> Option<AnalysisTask> {
        self.tasks.read().await.get(task_id).cloned()
    }

    pub async fn task_state(&self, task_id: &str) -> Option<TaskState> {
        self.tasks.read().await.get(task_id).map(|t| t.state)
    }

    /// Transition one task, enforcing the monotonic state machine.
    pub async fn set_state(&self, task_id: &str, state: TaskState) -> DomainResult<()> {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.transition_to(state)?;
        }
        Ok(())
    }

    /// Record a successful output: state, output text, token estimate.
    pub async fn record_success(&self, task_id: &str, output: String) -> DomainResult<()> {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.transition_to(TaskState::Success)?;
            task.token_estimate = estimate_tokens(&output);
            task.output = output;
        }
        Ok(())
    }

    /// Record a failure with its diagnostic output.
    pub async fn record_error(&self, task_id: &str, diagnostic: String) -> DomainResult<()> {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.transition_to(TaskState::Error)?;
            task.output = diagnostic;
            task.token_estimate = 0;
        }
        Ok(())
    }

    pub async fn set_citations(&self, task_id: &str, citations: Vec<Citation>) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.citations = citations;
        }
    }

    pub async fn push_progress(&self, task_id: &str, entry: ProgressEntry) {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.get_mut(task_id) {
            task.progress.push(entry);
        }
    }

    /// Point-in-time copy of all successful outputs, keyed by task id.
    pub async fn completed_outputs(&self) -> BTreeMap<String, String> {
        self.tasks
            .read()
            .await
            .values()
            .filter(|task| task.state == TaskState::Success)
            .map(|task| (task.id.clone(), task.output.clone()))
            .collect()
    }

    /// Idempotently apply a completed result pulled from the remote session.
    ///
    /// Returns true when the result was newly merged; re-applying a result
    /// for an already-successful task is a no-op.
    pub async fn merge_remote_result(&self, task_id: &str, output: &str) -> bool {
        if output.trim().is_empty() {
            return false;
        }
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(task_id) else {
            return false;
        };
        if task.state == TaskState::Success {
            return false;
        }
        // Merge only overrides tasks this process has not driven to a
        // terminal state itself.
        if task.state == TaskState::Error {
            return false;
        }
        task.state = TaskState::Success;
        task.output = output.to_string();
        task.token_estimate = estimate_tokens(output);
        task.completed_at = Some(Utc::now());
        true
    }

    pub async fn push_conclusion(&self, conclusion: DebateConclusion) {
        self.conclusions.write().await.push(conclusion);
    }

    pub async fn conclusions(&self) -> Vec<DebateConclusion> {
        self.conclusions.read().await.clone()
    }

    /// (succeeded, failed) counts over a set of task ids.
    pub async fn outcome_counts(&self, task_ids: &[&str]) -> (usize, usize) {
        let tasks = self.tasks.read().await;
        let mut succeeded = 0;
        let mut failed = 0;
        for id in task_ids {
            match tasks.get(*id).map(|t| t.state) {
                Some(TaskState::Success) => succeeded += 1,
                Some(TaskState::Error) => failed += 1,
                _ => {}
            }
        }
        (succeeded, failed)
    }

    /// Whether every catalogue task has reached a terminal state.
    pub async fn all_terminal(&self) -> bool {
        self.tasks.read().await.values().all(AnalysisTask::is_terminal)
    }

    /// Clones of all tasks in catalogue order.
    pub async fn tasks_in_order(&self) -> Vec<AnalysisTask> {
        let tasks = self.tasks.read().await;
        TaskRegistry::specs()
            .iter()
            .filter_map(|spec| tasks.get(spec.id).cloned())
            .collect()
    }

    /// Serialized mirror of the full in-memory state.
    pub async fn snapshot(&self) -> Snapshot {
        let tasks = self.tasks_in_order().await;
        let mut session = Session::new(self.session_id.clone(), self.stock_code.clone());
        session.started_at = self.started_at;
        session.status = self.status().await;
        for task in &tasks {
            if task.state == TaskState::Success {
                session.record_completed(task.id.clone());
            }
        }
        Snapshot {
            version: SNAPSHOT_VERSION,
            session,
            tasks,
            conclusions: self.conclusions().await,
            captured_at: Some(Utc::now()),
        }
    }
}
