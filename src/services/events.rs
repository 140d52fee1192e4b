//! Run event stream.
//!
//! The core is presentation-free: everything observable about a run is
//! emitted as `RunEvent`s over an mpsc channel and rendered elsewhere.
//! Emission is strictly best-effort and never blocks or fails the run.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::models::{ConclusionLabel, DebateKind, SessionStatus};

/// Events emitted over the lifetime of one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        session_id: String,
        stock_code: String,
    },
    StageStarted {
        stage: u8,
        step: u8,
        label: String,
        task_count: usize,
    },
    BatchStarted {
        stage: u8,
        batch: usize,
        batch_count: usize,
        size: usize,
    },
    StageCompleted {
        stage: u8,
        step: u8,
        succeeded: usize,
        failed: usize,
    },
    TaskStarted {
        task_id: String,
    },
    /// Cosmetic progress tick. Purely observational.
    TaskProgress {
        task_id: String,
        icon: String,
        label: String,
    },
    TaskCompleted {
        task_id: String,
        token_estimate: u64,
    },
    TaskFailed {
        task_id: String,
        error: String,
    },
    /// Heartbeat: a call has outlived another timeout segment and the
    /// invoker keeps waiting. Never influences success or failure.
    CallWaiting {
        label: String,
        segment: u32,
        max_segments: u32,
    },
    DebateStarted {
        kind: DebateKind,
        sides: usize,
        rounds: u32,
    },
    DebateConcluded {
        kind: DebateKind,
        label: ConclusionLabel,
        score: u8,
        degraded: bool,
    },
    /// A completed result was pulled from the remote session and merged.
    ResultMerged {
        task_id: String,
    },
    SnapshotSaved {
        session_id: String,
    },
    SessionCompleted {
        session_id: String,
        status: SessionStatus,
    },
    RunAborted {
        reason: String,
    },
    RunCompleted {
        session_id: String,
    },
}

/// Sender half of the run event stream.
pub type EventSender = mpsc::Sender<RunEvent>;

/// Best-effort emission: a full or closed channel drops the event rather
/// than stalling the pipeline.
pub fn emit(tx: &EventSender, event: RunEvent) {
    let _ = tx.try_send(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_never_blocks_when_unconsumed() {
        let (tx, _rx) = mpsc::channel(2);
        for _ in 0..10 {
            emit(
                &tx,
                RunEvent::TaskStarted {
                    task_id: "price-history".to_string(),
                },
            );
        }
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_is_a_noop() {
        let (tx, rx) = mpsc::channel(2);
        drop(rx);
        emit(
            &tx,
            RunEvent::RunCompleted {
                session_id: "sess-1".to_string(),
            },
        );
    }
}
