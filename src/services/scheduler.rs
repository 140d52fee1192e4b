//! Stage scheduler: executes stage plans as join barriers.
//!
//! Full-parallel plans dispatch every member concurrently; batched plans run
//! ordered chunks sequentially with concurrency inside each chunk, capping
//! backend load for the expensive stages. Nothing downstream dispatches until
//! the current plan has fully settled, and a failing task never cancels its
//! siblings.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, instrument};

use crate::domain::models::StagePlan;
use crate::services::context::RunContext;
use crate::services::events::RunEvent;
use crate::services::task_runner::TaskRunner;

pub struct StageScheduler {
    runner: Arc<TaskRunner>,
}

impl StageScheduler {
    pub fn new(runner: Arc<TaskRunner>) -> Self {
        Self { runner }
    }

    /// Run one stage plan to completion. Returns only after every dispatched
    /// task has reached a terminal state.
    #[instrument(skip(self, ctx, plan), fields(stage = plan.stage, step = plan.step, label = plan.label))]
    pub async fn run_plan(&self, ctx: &Arc<RunContext>, plan: &StagePlan) {
        ctx.emit(RunEvent::StageStarted {
            stage: plan.stage,
            step: plan.step,
            label: plan.label.to_string(),
            task_count: plan.tasks.len(),
        });

        let batches = plan.batches();
        let batch_count = batches.len();
        for (index, batch) in batches.into_iter().enumerate() {
            if batch_count > 1 {
                ctx.emit(RunEvent::BatchStarted {
                    stage: plan.stage,
                    batch: index + 1,
                    batch_count,
                    size: batch.len(),
                });
            }
            join_all(batch.iter().map(|task_id| self.runner.run(ctx, task_id))).await;
        }

        let (succeeded, failed) = ctx.outcome_counts(&plan.tasks).await;
        info!(
            stage = plan.stage,
            step = plan.step,
            succeeded,
            failed,
            "stage plan settled"
        );
        ctx.emit(RunEvent::StageCompleted {
            stage: plan.stage,
            step: plan.step,
            succeeded,
            failed,
        });
    }
}
