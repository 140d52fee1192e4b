//! Pipeline driver.
//!
//! Drives one full run: validate input, fetch the market snapshot, open the
//! session, execute the stage plans with the two debates interleaved,
//! assemble the report, and complete the session. Task failures are
//! contained; only validation and precondition failures abort.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Config, DebateConclusion, DebateKind, SessionStatus, Snapshot};
use crate::domain::ports::{
    AnalysisService, CitationProvider, DebateService, MarketDataProvider, SessionStore,
    SnapshotStore,
};
use crate::services::context::RunContext;
use crate::services::continuity::{ResumeDecision, SessionContinuity};
use crate::services::debate::DebateCoordinator;
use crate::services::events::{emit, EventSender, RunEvent};
use crate::services::registry::TaskRegistry;
use crate::services::report::ReportAssembler;
use crate::services::scheduler::StageScheduler;
use crate::services::task_runner::TaskRunner;

use super::validation::validate_stock_code;

/// Final product of a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub session_id: String,
    pub stock_code: String,
    pub document: String,
    pub conclusions: Vec<DebateConclusion>,
    pub completed: usize,
    pub failed: usize,
}

/// What a resume attempt produced.
#[derive(Debug)]
pub enum ResumeOutcome {
    /// The run was resumed against the live remote session and finished.
    Resumed(RunReport),
    /// Only a local snapshot exists; offered for manual inspection, the run
    /// itself is not continued.
    LocalStateOnly(Box<Snapshot>),
}

pub struct AnalysisPipeline {
    analysis: Arc<dyn AnalysisService>,
    debate: Arc<dyn DebateService>,
    sessions: Arc<dyn SessionStore>,
    market: Arc<dyn MarketDataProvider>,
    citations: HashMap<String, Arc<dyn CitationProvider>>,
    continuity: Arc<SessionContinuity>,
    config: Config,
    events: EventSender,
}

impl AnalysisPipeline {
    pub fn new(
        analysis: Arc<dyn AnalysisService>,
        debate: Arc<dyn DebateService>,
        sessions: Arc<dyn SessionStore>,
        snapshots: Arc<dyn SnapshotStore>,
        market: Arc<dyn MarketDataProvider>,
        config: Config,
        events: EventSender,
    ) -> Self {
        let continuity = Arc::new(SessionContinuity::new(
            Arc::clone(&sessions),
            snapshots,
            config.continuity.clone(),
        ));
        Self {
            analysis,
            debate,
            sessions,
            market,
            citations: HashMap::new(),
            continuity,
            config,
            events,
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

    /// Run the full pipeline for a stock code.
    #[instrument(skip(self))]
    pub async fn run(&self, raw_code: &str) -> DomainResult<RunReport> {
        let code = validate_stock_code(raw_code).map_err(|err| self.abort(err))?;

        // Unrecoverable precondition: no market snapshot, no run.
        let market = self
            .market
            .snapshot(&code)
            .await
            .map_err(|err| {
                self.abort(DomainError::Precondition(format!(
                    "no market snapshot for {code}: {err}"
                )))
            })?;
        if !market.is_usable() {
            return Err(self.abort(DomainError::Precondition(format!(
                "market snapshot for {code} carries no usable quote"
            ))));
        }

        let session_id = self.continuity.open(&code).await;
        let ctx = Arc::new(RunContext::new(
            session_id,
            code,
            market,
            self.events.clone(),
        ));
        self.execute(ctx).await
    }

    /// Resume after a process restart. A live remote session wins; a local
    /// snapshot alone is surfaced for manual inspection only.
    #[instrument(skip(self))]
    pub async fn resume(&self) -> DomainResult<ResumeOutcome> {
        match self.continuity.resolve_restart().await? {
            ResumeDecision::Fresh => Err(DomainError::SessionNotFound(
                "no resumable session found".to_string(),
            )),
            ResumeDecision::LocalOnly(snapshot) => {
                info!(
                    session_id = %snapshot.session.id,
                    "remote session unreachable, offering local snapshot"
                );
                Ok(ResumeOutcome::LocalStateOnly(Box::new(snapshot)))
            }
            ResumeDecision::Remote {
                session_id,
                stock_code,
            } => {
                let market = match self.market.snapshot(&stock_code).await {
                    Ok(market) if market.is_usable() => market,
                    Ok(_) | Err(_) => {
                        // Precondition failure with a session on record: mark
                        // it failed before aborting.
                        self.continuity.fail_session(&session_id).await;
                        return Err(self.abort(DomainError::Precondition(format!(
                            "no market snapshot for {stock_code}, resumed session marked failed"
                        ))));
                    }
                };
                let ctx = Arc::new(RunContext::new(
                    session_id,
                    stock_code,
                    market,
                    self.events.clone(),
                ));
                // Reconstruct every previously completed output before any
                // new dispatch.
                self.continuity.replay_completed(&ctx).await;
                Ok(ResumeOutcome::Resumed(self.execute(ctx).await?))
            }
        }
    }

    /// Shared tail of fresh and resumed runs: stages, debates, report,
    /// completion.
    async fn execute(&self, ctx: Arc<RunContext>) -> DomainResult<RunReport> {
        ctx.set_status(SessionStatus::Running).await;
        ctx.emit(RunEvent::RunStarted {
            session_id: ctx.session_id.clone(),
            stock_code: ctx.stock_code.clone(),
        });
        self.continuity.start_loops(&ctx);
        self.continuity.snapshot_now(&ctx).await;

        let runner = Arc::new(self.build_runner());
        let scheduler = StageScheduler::new(runner);
        let coordinator = DebateCoordinator::new(
            Arc::clone(&self.debate),
            self.config.invoker.clone(),
            self.config.debate.clone(),
        );

        let plans = TaskRegistry::stage_plans(self.config.scheduler.batch_size);
        for plan in &plans {
            scheduler.run_plan(&ctx, plan).await;
            self.continuity.snapshot_now(&ctx).await;

            // The directional debate joins after stage 1, the risk debate
            // after stage 2. Both are join barriers themselves: nothing
            // downstream dispatches until the conclusion is in.
            let debate_kind = match (plan.stage, plan.step) {
                (1, 3) => Some(DebateKind::Directional),
                (2, _) => Some(DebateKind::Risk),
                _ => None,
            };
            if let Some(kind) = debate_kind {
                let conclusion = coordinator.run(&ctx, kind).await;
                ctx.push_conclusion(conclusion).await;
                self.continuity.snapshot_now(&ctx).await;
            }
        }

        let document = ReportAssembler::assemble(&ctx).await;
        let conclusions = ctx.conclusions().await;
        let all_ids: Vec<&str> = TaskRegistry::specs().iter().map(|s| s.id).collect();
        let (completed, failed) = ctx.outcome_counts(&all_ids).await;

        ctx.set_status(SessionStatus::Completed).await;
        self.continuity.complete(&ctx, SessionStatus::Completed).await;
        ctx.emit(RunEvent::RunCompleted {
            session_id: ctx.session_id.clone(),
        });
        info!(
            session_id = %ctx.session_id,
            completed,
            failed,
            "pipeline run finished"
        );
        if failed > 0 {
            error!(failed, "run finished with failed tasks");
        }

        Ok(RunReport {
            session_id: ctx.session_id.clone(),
            stock_code: ctx.stock_code.clone(),
            document,
            conclusions,
            completed,
            failed,
        })
    }

    /// Emit the user-visible abort event and hand the error back.
    fn abort(&self, err: DomainError) -> DomainError {
        emit(
            &self.events,
            RunEvent::RunAborted {
                reason: err.to_string(),
            },
        );
        err
    }

    fn build_runner(&self) -> TaskRunner {
        let mut runner = TaskRunner::new(
            Arc::clone(&self.analysis),
            Arc::clone(&self.sessions),
            self.config.invoker.clone(),
        );
        for (task_id, provider) in &self.citations {
            runner = runner.with_citation_provider(task_id.clone(), Arc::clone(provider));
        }
        runner
    }
}
