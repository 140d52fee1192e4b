//! Task runner: drives one task through its state machine.
//!
//! idle -> fetching -> analyzing -> {success, error}. The runner never
//! retries; retry is the invoker's responsibility. Failures are contained to
//! the task and never cancel siblings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::domain::models::{Citation, InvokerConfig, ProgressEntry, TaskState};
use crate::domain::ports::{AnalysisRequest, AnalysisService, CitationProvider, SessionStore};
use crate::services::context::RunContext;
use crate::services::events::RunEvent;
use crate::services::invoker::ResilientInvoker;
use crate::services::registry::{TaskRegistry, TaskSpec};

/// Executes single tasks against the analysis collaborator.
pub struct TaskRunner {
    analysis: Arc<dyn AnalysisService>,
    sessions: Arc<dyn SessionStore>,
    citations: HashMap<String, Arc<dyn CitationProvider>>,
    invoker_config: InvokerConfig,
}

impl TaskRunner {
    pub fn new(
        analysis: Arc<dyn AnalysisService>,
        sessions: Arc<dyn SessionStore>,
        invoker_config: InvokerConfig,
    ) -> Self {
        Self {
            analysis,
            sessions,
            citations: HashMap::new(),
            invoker_config,
        }
    }

    /// Attach an enrichment collaborator for one task id.
    pub fn with_citation_provider(
        mut self,
        task_id: impl Into<String>,
        provider: Arc<dyn CitationProvider>,
    ) -> Self {
        self.citations.insert(task_id.into(), provider);
        self
    }

    /// Run one task to a terminal state. Never returns an error: failures
    /// are recorded on the task itself.
    #[instrument(skip(self, ctx), fields(stock_code = %ctx.stock_code))]
    pub async fn run(&self, ctx: &Arc<RunContext>, task_id: &str) {
        let Some(spec) = TaskRegistry::spec(task_id) else {
            warn!(task_id, "unknown task id, skipping");
            return;
        };

        // Resume path: a task already merged as successful is not re-run.
        if ctx.task_state(task_id).await == Some(TaskState::Success) {
            debug!(task_id, "already complete, skipping");
            return;
        }

        ctx.emit(RunEvent::TaskStarted {
            task_id: task_id.to_string(),
        });

        if ctx.set_state(task_id, TaskState::Fetching).await.is_err() {
            return;
        }
        let citations = self.gather_citations(ctx, spec).await;
        ctx.set_citations(task_id, citations).await;

        if ctx.set_state(task_id, TaskState::Analyzing).await.is_err() {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let ticker = spawn_progress_ticker(Arc::clone(ctx), spec, stop_rx);

        let request = AnalysisRequest {
            task_id: task_id.to_string(),
            stock_code: ctx.stock_code.clone(),
            market: ctx.market.clone(),
            prior_outputs: ctx.completed_outputs().await,
            instruction: spec.instruction.to_string(),
        };
        let invoker =
            ResilientInvoker::for_weight(&self.invoker_config, spec.weight).with_events(ctx.events());
        let analysis = Arc::clone(&self.analysis);
        let outcome = invoker
            .invoke(task_id, move || {
                let analysis = Arc::clone(&analysis);
                let request = request.clone();
                async move { analysis.analyze(&request).await }
            })
            .await;

        // The progress log must stop the moment the call settles.
        let _ = stop_tx.send(true);
        let _ = ticker.await;

        match outcome {
            Ok(response) if !response.output.trim().is_empty() => {
                let _ = ctx.record_success(task_id, response.output.clone()).await;
                let token_estimate = ctx
                    .task(task_id)
                    .await
                    .map_or(0, |task| task.token_estimate);
                ctx.emit(RunEvent::TaskCompleted {
                    task_id: task_id.to_string(),
                    token_estimate,
                });
                // Best-effort remote persistence; failure is logged, not fatal.
                if let Err(err) = self
                    .sessions
                    .record_task_result(&ctx.session_id, task_id, &response.output)
                    .await
                {
                    warn!(task_id, error = %err, "remote result persistence failed");
                }
            }
            Ok(_) => {
                self.fail(ctx, spec, "collaborator returned an empty document")
                    .await;
            }
            Err(err) => {
                self.fail(ctx, spec, &err.to_string()).await;
            }
        }
    }

    async fn fail(&self, ctx: &Arc<RunContext>, spec: &TaskSpec, reason: &str) {
        let diagnostic = diagnostic_output(spec.title, reason);
        let _ = ctx.record_error(spec.id, diagnostic).await;
        ctx.emit(RunEvent::TaskFailed {
            task_id: spec.id.to_string(),
            error: reason.to_string(),
        });
    }

    /// Enrichment is best-effort: any failure, or the absence of a provider,
    /// yields the deterministic placeholder list.
    async fn gather_citations(&self, ctx: &Arc<RunContext>, spec: &TaskSpec) -> Vec<Citation> {
        if let Some(provider) = self.citations.get(spec.id) {
            match provider.citations(spec.id, &ctx.stock_code).await {
                Ok(citations) if !citations.is_empty() => return citations,
                Ok(_) => {
                    debug!(task_id = spec.id, "citation provider returned nothing");
                }
                Err(err) => {
                    warn!(
                        task_id = spec.id,
                        provider = provider.name(),
                        error = %err,
                        "citation enrichment failed, using placeholder"
                    );
                }
            }
        }
        placeholder_citations(spec)
    }
}

/// Deterministic placeholder used whenever enrichment yields nothing.
pub fn placeholder_citations(spec: &TaskSpec) -> Vec<Citation> {
    vec![Citation {
        name: format!("{}-archive", spec.group),
        count: 1,
        description: format!("Cached reference material for {}", spec.title),
    }]
}

/// Diagnostic output template for failed tasks.
fn diagnostic_output(title: &str, reason: &str) -> String {
    format!(
        "[{title}] analysis unavailable: {reason}. Downstream sections \
         continue without this input."
    )
}

/// Cosmetic progress log: emits the group's fixed {icon, label} sequence at
/// one-second cadence until the sequence is exhausted or the task settles.
fn spawn_progress_ticker(
    ctx: Arc<RunContext>,
    spec: &'static TaskSpec,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let script = TaskRegistry::progress_script(spec.group);
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately; consume it
        // so entries land at a one-second cadence.
        interval.tick().await;
        for (icon, label) in script {
            tokio::select! {
                _ = stop.changed() => return,
                _ = interval.tick() => {
                    ctx.push_progress(
                        spec.id,
                        ProgressEntry {
                            icon: (*icon).to_string(),
                            label: (*label).to_string(),
                        },
                    )
                    .await;
                    ctx.emit(RunEvent::TaskProgress {
                        task_id: spec.id.to_string(),
                        icon: (*icon).to_string(),
                        label: (*label).to_string(),
                    });
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ServiceError;
    use crate::domain::models::{MarketSnapshot, SessionStatus};
    use crate::domain::ports::{AnalysisResponse, RemoteSessionStatus};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::mpsc;

    struct FixedAnalysis {
        output: String,
        calls: AtomicU32,
    }

    #[async_trait]
    impl AnalysisService for FixedAnalysis {
        async fn analyze(
            &self,
            _request: &AnalysisRequest,
        ) -> Result<AnalysisResponse, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.output.is_empty() {
                Err(ServiceError::Transport("down".into()))
            } else {
                Ok(AnalysisResponse {
                    output: self.output.clone(),
                })
            }
        }
    }

    struct NullSessions;

    #[async_trait]
    impl SessionStore for NullSessions {
        async fn create(&self, _stock_code: &str) -> Result<String, ServiceError> {
            Ok("sess-test".to_string())
        }
        async fn start(&self, _session_id: &str) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn record_task_result(
            &self,
            _session_id: &str,
            _task_id: &str,
            _output: &str,
        ) -> Result<(), ServiceError> {
            Err(ServiceError::Transport("store offline".into()))
        }
        async fn complete(
            &self,
            _session_id: &str,
            _status: SessionStatus,
        ) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn status(&self, session_id: &str) -> Result<RemoteSessionStatus, ServiceError> {
            let _ = session_id;
            Err(ServiceError::Transport("store offline".into()))
        }
        async fn task_result(
            &self,
            _session_id: &str,
            _task_id: &str,
        ) -> Result<Option<String>, ServiceError> {
            Ok(None)
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

    fn fast_config() -> InvokerConfig {
        InvokerConfig {
            light_segment_secs: 1,
            standard_segment_secs: 1,
            heavy_segment_secs: 1,
            debate_segment_secs: 1,
            max_segments: 2,
            max_retries: 1,
            backoff_ms: 10,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_records_output_tokens_and_placeholder_citations() {
        let (tx, _rx) = mpsc::channel(256);
        let ctx = Arc::new(RunContext::new("sess-1", "600000", market(), tx));
        let runner = TaskRunner::new(
            Arc::new(FixedAnalysis {
                output: "strong demand and margin improvement".to_string(),
                calls: AtomicU32::new(0),
            }),
            Arc::new(NullSessions),
            fast_config(),
        );

        runner.run(&ctx, "price-history").await;

        let task = ctx.task("price-history").await.unwrap();
        assert_eq!(task.state, TaskState::Success);
        assert!(!task.output.is_empty());
        assert_eq!(
            task.token_estimate,
            crate::domain::models::estimate_tokens(&task.output)
        );
        assert_eq!(task.citations.len(), 1);
        assert_eq!(task.citations[0].name, "collect-archive");
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistence_failure_does_not_fail_the_task() {
        // NullSessions rejects every record_task_result call.
        let (tx, _rx) = mpsc::channel(256);
        let ctx = Arc::new(RunContext::new("sess-1", "600000", market(), tx));
        let runner = TaskRunner::new(
            Arc::new(FixedAnalysis {
                output: "ok".repeat(40),
                calls: AtomicU32::new(0),
            }),
            Arc::new(NullSessions),
            fast_config(),
        );

        runner.run(&ctx, "realtime-quote").await;
        assert_eq!(
            ctx.task_state("realtime-quote").await,
            Some(TaskState::Success)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_call_leaves_diagnostic_error() {
        let (tx, _rx) = mpsc::channel(256);
        let ctx = Arc::new(RunContext::new("sess-1", "600000", market(), tx));
        let analysis = Arc::new(FixedAnalysis {
            output: String::new(),
            calls: AtomicU32::new(0),
        });
        let runner = TaskRunner::new(analysis.clone(), Arc::new(NullSessions), fast_config());

        runner.run(&ctx, "fund-flow").await;

        let task = ctx.task("fund-flow").await.unwrap();
        assert_eq!(task.state, TaskState::Error);
        assert!(task.output.contains("analysis unavailable"));
        // max_retries = 1 means exactly two attempts.
        assert_eq!(analysis.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_successful_task_is_skipped() {
        let (tx, _rx) = mpsc::channel(256);
        let ctx = Arc::new(RunContext::new("sess-1", "600000", market(), tx));
        ctx.merge_remote_result("price-history", "merged earlier").await;

        let analysis = Arc::new(FixedAnalysis {
            output: "fresh output".to_string(),
            calls: AtomicU32::new(0),
        });
        let runner = TaskRunner::new(analysis.clone(), Arc::new(NullSessions), fast_config());
        runner.run(&ctx, "price-history").await;

        assert_eq!(analysis.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            ctx.task("price-history").await.unwrap().output,
            "merged earlier"
        );
    }
}
