//! Session continuity: remote session lifecycle, status polling, and local
//! snapshots for crash-resilient resume.
//!
//! Polling and snapshotting are cooperative interval loops, never blocking
//! waits. An unreachable endpoint is logged and retried next tick; local
//! persistence failures are logged and never fatal. At most one polling loop
//! runs per session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainResult, ServiceError};
use crate::domain::models::{ContinuityConfig, SessionStatus, Snapshot, TaskState};
use crate::domain::ports::{SessionStore, SnapshotStore};
use crate::services::context::RunContext;
use crate::services::events::RunEvent;

/// What a restart should do, resolved from the pointer and the remote store.
#[derive(Debug)]
pub enum ResumeDecision {
    /// Nothing to resume.
    Fresh,
    /// A live remote session exists; resume it and replay completed results.
    Remote {
        session_id: String,
        stock_code: String,
    },
    /// The remote side is unreachable but an in-progress local snapshot
    /// exists. Offered for manual inspection of UI state only; the run is
    /// not continued from it.
    LocalOnly(Snapshot),
}

pub struct SessionContinuity {
    store: Arc<dyn SessionStore>,
    snapshots: Arc<dyn SnapshotStore>,
    config: ContinuityConfig,
    polling_active: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl SessionContinuity {
    pub fn new(
        store: Arc<dyn SessionStore>,
        snapshots: Arc<dyn SnapshotStore>,
        config: ContinuityConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            store,
            snapshots,
            config,
            polling_active: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Create the remote session and persist the local pointer.
    ///
    /// Remote creation failing is a persistence problem, not a run killer:
    /// the run continues under a locally generated id and polling keeps
    /// retrying against it.
    #[instrument(skip(self))]
    pub async fn open(&self, stock_code: &str) -> String {
        let session_id = match self.store.create(stock_code).await {
            Ok(id) => {
                if let Err(err) = self.store.start(&id).await {
                    warn!(error = %err, "failed to mark remote session running");
                }
                id
            }
            Err(err) => {
                warn!(error = %err, "remote session creation failed, using local id");
                format!("local-{}", Uuid::new_v4())
            }
        };
        if let Err(err) = self.snapshots.set_current(&session_id).await {
            warn!(error = %err, "failed to persist current-session pointer");
        }
        info!(session_id = %session_id, "session opened");
        session_id
    }

    /// Start the polling and snapshot loops for a live run.
    pub fn start_loops(self: &Arc<Self>, ctx: &Arc<RunContext>) {
        self.spawn_polling(ctx);
        self.spawn_snapshots(ctx);
    }

    fn spawn_polling(self: &Arc<Self>, ctx: &Arc<RunContext>) {
        if self
            .polling_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(session_id = %ctx.session_id, "polling loop already active, not starting another");
            return;
        }
        let this = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            let mut shutdown = this.shutdown.subscribe();
            let mut interval =
                tokio::time::interval(Duration::from_secs(this.config.poll_interval_secs.max(1)));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = interval.tick() => {
                        match this.poll_once(&ctx).await {
                            Ok(true) => {
                                debug!(session_id = %ctx.session_id, "remote session terminal, stopping poll loop");
                                if let Err(err) = this.snapshots.clear(&ctx.session_id).await {
                                    warn!(error = %err, "failed to clear snapshot");
                                }
                                let _ = this.snapshots.clear_current().await;
                                break;
                            }
                            Ok(false) => {}
                            Err(err) => {
                                // No backoff escalation: just try again next tick.
                                warn!(error = %err, "session polling failed, retrying next tick");
                            }
                        }
                    }
                }
            }
            this.polling_active.store(false, Ordering::SeqCst);
        });
    }

    fn spawn_snapshots(self: &Arc<Self>, ctx: &Arc<RunContext>) {
        let this = Arc::clone(self);
        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            let mut shutdown = this.shutdown.subscribe();
            let mut interval = tokio::time::interval(Duration::from_secs(
                this.config.snapshot_interval_secs.max(1),
            ));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = interval.tick() => this.snapshot_now(&ctx).await,
                }
            }
        });
    }

    /// One polling pass: query remote status and idempotently merge any
    /// newly completed task results. Returns true when the remote session
    /// has reached a terminal status.
    pub async fn poll_once(&self, ctx: &Arc<RunContext>) -> Result<bool, ServiceError> {
        let remote = self.store.status(&ctx.session_id).await?;
        for task_id in &remote.completed_tasks {
            if ctx.task_state(task_id).await == Some(TaskState::Success) {
                continue;
            }
            match self.store.task_result(&ctx.session_id, task_id).await {
                Ok(Some(output)) => {
                    if ctx.merge_remote_result(task_id, &output).await {
                        debug!(task_id, "merged remote task result");
                        ctx.emit(RunEvent::ResultMerged {
                            task_id: task_id.clone(),
                        });
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(task_id, error = %err, "failed to pull remote task result");
                }
            }
        }
        Ok(remote.status.is_terminal())
    }

    /// Write a snapshot immediately (also called on significant events such
    /// as stage boundaries and debate conclusions).
    pub async fn snapshot_now(&self, ctx: &Arc<RunContext>) {
        let snapshot = ctx.snapshot().await;
        match self.snapshots.save(&snapshot).await {
            Ok(()) => ctx.emit(RunEvent::SnapshotSaved {
                session_id: ctx.session_id.clone(),
            }),
            Err(err) => warn!(error = %err, "local snapshot write failed"),
        }
    }

    /// Finish the run: move the remote session to a terminal status, stop
    /// the loops, and clear persisted state.
    pub async fn complete(&self, ctx: &Arc<RunContext>, status: SessionStatus) {
        if let Err(err) = self.store.complete(&ctx.session_id, status).await {
            warn!(error = %err, "failed to complete remote session");
        }
        let _ = self.shutdown.send(true);
        if let Err(err) = self.snapshots.clear(&ctx.session_id).await {
            warn!(error = %err, "failed to clear snapshot");
        }
        if let Err(err) = self.snapshots.clear_current().await {
            warn!(error = %err, "failed to clear current-session pointer");
        }
        ctx.emit(RunEvent::SessionCompleted {
            session_id: ctx.session_id.clone(),
            status,
        });
    }

    /// Best-effort abort for a session that has no context yet (e.g. a
    /// precondition failure during resume).
    pub async fn fail_session(&self, session_id: &str) {
        if let Err(err) = self.store.complete(session_id, SessionStatus::Error).await {
            warn!(error = %err, "failed to mark remote session failed");
        }
        let _ = self.shutdown.send(true);
    }

    /// Decide what a process restart should do. A live remote session takes
    /// precedence over any local snapshot.
    pub async fn resolve_restart(&self) -> DomainResult<ResumeDecision> {
        let Some(session_id) = self.snapshots.current().await? else {
            return Ok(ResumeDecision::Fresh);
        };
        match self.store.status(&session_id).await {
            Ok(remote) if !remote.status.is_terminal() => Ok(ResumeDecision::Remote {
                session_id,
                stock_code: remote.stock_code,
            }),
            Ok(_) => {
                // Finished remotely; nothing to resume.
                let _ = self.snapshots.clear(&session_id).await;
                let _ = self.snapshots.clear_current().await;
                Ok(ResumeDecision::Fresh)
            }
            Err(err) => {
                warn!(error = %err, "remote session unreachable, checking local snapshot");
                match self.snapshots.load(&session_id).await? {
                    Some(snapshot) if !snapshot.session.status.is_terminal() => {
                        Ok(ResumeDecision::LocalOnly(snapshot))
                    }
                    _ => Ok(ResumeDecision::Fresh),
                }
            }
        }
    }

    /// Replay completed remote results into a fresh context before the
    /// pipeline continues a resumed run.
    pub async fn replay_completed(&self, ctx: &Arc<RunContext>) {
        if let Err(err) = self.poll_once(ctx).await {
            warn!(error = %err, "replay poll failed, continuing with local state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::MarketSnapshot;
    use crate::domain::ports::RemoteSessionStatus;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct MemorySessions {
        status: Mutex<Option<RemoteSessionStatus>>,
        results: Mutex<HashMap<String, String>>,
        pulls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SessionStore for MemorySessions {
        async fn create(&self, _stock_code: &str) -> Result<String, ServiceError> {
            Ok("sess-remote".to_string())
        }
        async fn start(&self, _session_id: &str) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn record_task_result(
            &self,
            _session_id: &str,
            task_id: &str,
            output: &str,
        ) -> Result<(), ServiceError> {
            self.results
                .lock()
                .unwrap()
                .insert(task_id.to_string(), output.to_string());
            Ok(())
        }
        async fn complete(
            &self,
            _session_id: &str,
            _status: SessionStatus,
        ) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn status(&self, _session_id: &str) -> Result<RemoteSessionStatus, ServiceError> {
            self.status
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ServiceError::Transport("unreachable".into()))
        }
        async fn task_result(
            &self,
            _session_id: &str,
            task_id: &str,
        ) -> Result<Option<String>, ServiceError> {
            self.pulls.lock().unwrap().push(task_id.to_string());
            Ok(self.results.lock().unwrap().get(task_id).cloned())
        }
    }

    #[derive(Default)]
    struct MemorySnapshots {
        current: Mutex<Option<String>>,
        blobs: Mutex<HashMap<String, Snapshot>>,
    }

    #[async_trait]
    impl SnapshotStore for MemorySnapshots {
        async fn save(&self, snapshot: &Snapshot) -> DomainResult<()> {
            self.blobs
                .lock()
                .unwrap()
                .insert(snapshot.session.id.clone(), snapshot.clone());
            Ok(())
        }
        async fn load(&self, session_id: &str) -> DomainResult<Option<Snapshot>> {
            Ok(self.blobs.lock().unwrap().get(session_id).cloned())
        }
        async fn clear(&self, session_id: &str) -> DomainResult<()> {
            self.blobs.lock().unwrap().remove(session_id);
            Ok(())
        }
        async fn set_current(&self, session_id: &str) -> DomainResult<()> {
            *self.current.lock().unwrap() = Some(session_id.to_string());
            Ok(())
        }
        async fn current(&self) -> DomainResult<Option<String>> {
            Ok(self.current.lock().unwrap().clone())
        }
        async fn clear_current(&self) -> DomainResult<()> {
            *self.current.lock().unwrap() = None;
            Ok(())
        }
    }

    fn market() -> MarketSnapshot {
        MarketSnapshot {
            code: "600000".to_string(),
            name: "SPD Bank".to_string(),
            price: 8.42,
            change_percent: 1.2,
            turnover: 1_000_000.0,
            pe_ratio: Some(6.1),
            pb_ratio: Some(0.8),
            captured_at: Utc::now(),
        }
    }

    fn ctx() -> Arc<RunContext> {
        let (tx, _rx) = mpsc::channel(256);
        Arc::new(RunContext::new("sess-remote", "600000", market(), tx))
    }

    #[tokio::test]
    async fn test_poll_once_merges_new_results_idempotently() {
        let sessions = Arc::new(MemorySessions::default());
        *sessions.status.lock().unwrap() = Some(RemoteSessionStatus {
            status: SessionStatus::Running,
            stock_code: "600000".to_string(),
            completed_tasks: vec!["price-history".to_string()],
        });
        sessions
            .results
            .lock()
            .unwrap()
            .insert("price-history".to_string(), "remote output".to_string());

        let continuity = SessionContinuity::new(
            sessions.clone(),
            Arc::new(MemorySnapshots::default()),
            ContinuityConfig::default(),
        );
        let ctx = ctx();

        assert!(!continuity.poll_once(&ctx).await.unwrap());
        assert_eq!(
            ctx.task("price-history").await.unwrap().output,
            "remote output"
        );

        // Second pass: already merged, no second pull.
        assert!(!continuity.poll_once(&ctx).await.unwrap());
        assert_eq!(sessions.pulls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_poll_once_reports_terminal_status() {
        let sessions = Arc::new(MemorySessions::default());
        *sessions.status.lock().unwrap() = Some(RemoteSessionStatus {
            status: SessionStatus::Completed,
            stock_code: "600000".to_string(),
            completed_tasks: vec![],
        });
        let continuity = SessionContinuity::new(
            sessions,
            Arc::new(MemorySnapshots::default()),
            ContinuityConfig::default(),
        );
        assert!(continuity.poll_once(&ctx()).await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_restart_prefers_live_remote_session() {
        let sessions = Arc::new(MemorySessions::default());
        *sessions.status.lock().unwrap() = Some(RemoteSessionStatus {
            status: SessionStatus::Running,
            stock_code: "000001".to_string(),
            completed_tasks: vec![],
        });
        let snapshots = Arc::new(MemorySnapshots::default());
        snapshots.set_current("sess-remote").await.unwrap();

        let continuity =
            SessionContinuity::new(sessions, snapshots, ContinuityConfig::default());
        match continuity.resolve_restart().await.unwrap() {
            ResumeDecision::Remote {
                session_id,
                stock_code,
            } => {
                assert_eq!(session_id, "sess-remote");
                assert_eq!(stock_code, "000001");
            }
            other => panic!("expected remote resume, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_restart_offers_local_snapshot_when_remote_is_down() {
        let sessions = Arc::new(MemorySessions::default()); // status() fails
        let snapshots = Arc::new(MemorySnapshots::default());
        snapshots.set_current("sess-remote").await.unwrap();
        let ctx = ctx();
        ctx.set_status(SessionStatus::Running).await;
        snapshots.save(&ctx.snapshot().await).await.unwrap();

        let continuity =
            SessionContinuity::new(sessions, snapshots, ContinuityConfig::default());
        assert!(matches!(
            continuity.resolve_restart().await.unwrap(),
            ResumeDecision::LocalOnly(_)
        ));
    }

    #[tokio::test]
    async fn test_resolve_restart_with_no_pointer_is_fresh() {
        let continuity = SessionContinuity::new(
            Arc::new(MemorySessions::default()),
            Arc::new(MemorySnapshots::default()),
            ContinuityConfig::default(),
        );
        assert!(matches!(
            continuity.resolve_restart().await.unwrap(),
            ResumeDecision::Fresh
        ));
    }

    #[tokio::test]
    async fn test_only_one_polling_loop_per_session() {
        let continuity = Arc::new(SessionContinuity::new(
            Arc::new(MemorySessions::default()),
            Arc::new(MemorySnapshots::default()),
            ContinuityConfig::default(),
        ));
        let ctx = ctx();
        continuity.spawn_polling(&ctx);
        assert!(continuity.polling_active.load(Ordering::SeqCst));
        // Second call is refused while the first loop is alive.
        continuity.spawn_polling(&ctx);
        let _ = continuity.shutdown.send(true);
    }
}
