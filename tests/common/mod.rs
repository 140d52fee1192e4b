//! Common test utilities for integration tests.
//!
//! In-memory collaborator mocks with scriptable failure behavior, shared
//! across the scenario tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use delphi::domain::errors::{DomainResult, ServiceError};
use delphi::domain::models::{
    Config, DebateKind, DebateRound, InvokerConfig, MarketSnapshot, SessionStatus, Snapshot,
};
use delphi::domain::ports::{
    AnalysisRequest, AnalysisResponse, AnalysisService, DebateRequest, DebateResponse,
    DebateService, MarketDataProvider, RemoteSessionStatus, SessionStore, SnapshotStore,
};

/// Pipeline config with sub-second-scale timings for paused-clock tests.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.invoker = InvokerConfig {
        light_segment_secs: 1,
        standard_segment_secs: 1,
        heavy_segment_secs: 1,
        debate_segment_secs: 2,
        max_segments: 3,
        max_retries: 1,
        backoff_ms: 100,
    };
    config.continuity.poll_interval_secs = 1;
    config.continuity.snapshot_interval_secs = 1;
    config
}

pub fn market_snapshot(code: &str) -> MarketSnapshot {
    MarketSnapshot {
        code: code.to_string(),
        name: format!("Stock {code}"),
        price: 12.34,
        change_percent: 1.8,
        turnover: 2_000_000.0,
        pe_ratio: Some(14.0),
        pb_ratio: Some(1.1),
        captured_at: Utc::now(),
    }
}

/// Per-task behavior of the scripted analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    FailTransport,
    Hang,
}

/// Analysis mock that records call order, call counts, and the maximum
/// number of concurrently in-flight calls.
pub struct ScriptedAnalysis {
    behaviors: Mutex<HashMap<String, Behavior>>,
    delay: Duration,
    pub log: Mutex<Vec<String>>,
    concurrent: AtomicUsize,
    pub max_concurrent: AtomicUsize,
    pub calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedAnalysis {
    pub fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            delay: Duration::from_millis(20),
            log: Mutex::new(Vec::new()),
            concurrent: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_behavior(&self, task_id: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .unwrap()
            .insert(task_id.to_string(), behavior);
    }

    pub fn call_count(&self, task_id: &str) -> u32 {
        self.calls.lock().unwrap().get(task_id).copied().unwrap_or(0)
    }

    pub fn called(&self, task_id: &str) -> bool {
        self.call_count(task_id) > 0
    }
}

#[async_trait]
impl AnalysisService for ScriptedAnalysis {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ServiceError> {
        self.log.lock().unwrap().push(request.task_id.clone());
        *self
            .calls
            .lock()
            .unwrap()
            .entry(request.task_id.clone())
            .or_insert(0) += 1;

        let current = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(current, Ordering::SeqCst);

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&request.task_id)
            .copied()
            .unwrap_or(Behavior::Succeed);

        let result = match behavior {
            Behavior::Succeed => {
                tokio::time::sleep(self.delay).await;
                Ok(AnalysisResponse {
                    output: format!(
                        "{} analysis for {}: steady growth, strong demand, margin improvement.",
                        request.task_id, request.stock_code
                    ),
                })
            }
            Behavior::FailTransport => {
                tokio::time::sleep(self.delay).await;
                Err(ServiceError::Transport("connection reset".into()))
            }
            Behavior::Hang => {
                self.concurrent.fetch_sub(1, Ordering::SeqCst);
                futures::future::pending::<()>().await;
                unreachable!()
            }
        };

        self.concurrent.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Behavior of the scripted debate service, settable per debate kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebateBehavior {
    Succeed,
    Hang,
    Degraded,
    FailTransport,
}

pub struct ScriptedDebate {
    behaviors: Mutex<HashMap<DebateKind, DebateBehavior>>,
    pub calls: Mutex<Vec<DebateKind>>,
}

impl ScriptedDebate {
    pub fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, kind: DebateKind, behavior: DebateBehavior) {
        self.behaviors.lock().unwrap().insert(kind, behavior);
    }
}

#[async_trait]
impl DebateService for ScriptedDebate {
    async fn run_debate(&self, request: &DebateRequest) -> Result<DebateResponse, ServiceError> {
        self.calls.lock().unwrap().push(request.kind);
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&request.kind)
            .copied()
            .unwrap_or(DebateBehavior::Succeed);

        match behavior {
            DebateBehavior::Succeed => {
                let verdict = match request.kind {
                    DebateKind::Directional => "buy",
                    DebateKind::Risk => "moderate",
                };
                let side_views = request
                    .kind
                    .sides()
                    .iter()
                    .map(|side| DebateRound {
                        side: (*side).to_string(),
                        content: format!(
                            "{side} opening:\nThe {side} case rests on the collected evidence \
                             and holds up under cross examination."
                        ),
                        round: 1,
                    })
                    .collect();
                Ok(DebateResponse {
                    side_views,
                    verdict: verdict.to_string(),
                    summary: format!("{} debate settled on {verdict}.", request.kind.as_str()),
                    degraded: false,
                })
            }
            DebateBehavior::Hang => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
            DebateBehavior::Degraded => Ok(DebateResponse {
                side_views: vec![],
                verdict: String::new(),
                summary: String::new(),
                degraded: true,
            }),
            DebateBehavior::FailTransport => {
                Err(ServiceError::Transport("connection reset".into()))
            }
        }
    }
}

/// In-memory remote session store.
#[derive(Debug)]
pub struct SessionRecord {
    pub stock_code: String,
    pub status: SessionStatus,
    pub results: BTreeMap<String, String>,
}

pub struct MemorySessionStore {
    next_id: AtomicU32,
    pub sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Preseed a session, e.g. one left behind by a crashed process.
    pub fn preseed(
        &self,
        session_id: &str,
        stock_code: &str,
        status: SessionStatus,
        results: &[(&str, &str)],
    ) {
        self.sessions.lock().unwrap().insert(
            session_id.to_string(),
            SessionRecord {
                stock_code: stock_code.to_string(),
                status,
                results: results
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            },
        );
    }

    pub fn status_of(&self, session_id: &str) -> Option<SessionStatus> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .map(|record| record.status)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, stock_code: &str) -> Result<String, ServiceError> {
        let id = format!("sess-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sessions.lock().unwrap().insert(
            id.clone(),
            SessionRecord {
                stock_code: stock_code.to_string(),
                status: SessionStatus::Created,
                results: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    async fn start(&self, session_id: &str) -> Result<(), ServiceError> {
        if let Some(record) = self.sessions.lock().unwrap().get_mut(session_id) {
            record.status = SessionStatus::Running;
        }
        Ok(())
    }

    async fn record_task_result(
        &self,
        session_id: &str,
        task_id: &str,
        output: &str,
    ) -> Result<(), ServiceError> {
        if let Some(record) = self.sessions.lock().unwrap().get_mut(session_id) {
            record
                .results
                .insert(task_id.to_string(), output.to_string());
        }
        Ok(())
    }

    async fn complete(&self, session_id: &str, status: SessionStatus) -> Result<(), ServiceError> {
        if let Some(record) = self.sessions.lock().unwrap().get_mut(session_id) {
            record.status = status;
        }
        Ok(())
    }

    async fn status(&self, session_id: &str) -> Result<RemoteSessionStatus, ServiceError> {
        let sessions = self.sessions.lock().unwrap();
        let record = sessions
            .get(session_id)
            .ok_or_else(|| ServiceError::Status(404))?;
        Ok(RemoteSessionStatus {
            status: record.status,
            stock_code: record.stock_code.clone(),
            completed_tasks: record.results.keys().cloned().collect(),
        })
    }

    async fn task_result(
        &self,
        session_id: &str,
        task_id: &str,
    ) -> Result<Option<String>, ServiceError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .get(session_id)
            .and_then(|record| record.results.get(task_id).cloned()))
    }
}

/// In-memory snapshot store.
pub struct MemorySnapshotStore {
    pub current: Mutex<Option<String>>,
    pub blobs: Mutex<HashMap<String, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            blobs: Mutex::new(HashMap::new()),
        }
    }

    /// Preseed the current-session pointer, as a crashed process would have
    /// left it.
    pub fn set_current_sync(&self, session_id: &str) {
        *self.current.lock().unwrap() = Some(session_id.to_string());
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
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

/// Market provider that can be switched off to trigger the precondition
/// abort.
pub struct ScriptedMarket {
    pub available: std::sync::atomic::AtomicBool,
}

impl ScriptedMarket {
    pub fn new() -> Self {
        Self {
            available: std::sync::atomic::AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedMarket {
    async fn snapshot(&self, stock_code: &str) -> Result<MarketSnapshot, ServiceError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(market_snapshot(stock_code))
        } else {
            Err(ServiceError::Transport("quote feed offline".into()))
        }
    }
}
