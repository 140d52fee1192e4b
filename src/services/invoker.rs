//! Resilient invoker: segmented timeouts plus a bounded retry budget around
//! one outbound call.
//!
//! Long server operations report progress across timeout windows, so a call
//! that outlives one window is not dead: the invoker keeps waiting, one
//! segment at a time, until `max_segments` windows have elapsed. Transport
//! faults are retried after a fixed backoff while the budget lasts; segment
//! exhaustion is terminal for the call and never retried.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::domain::errors::{InvokeError, ServiceError};
use crate::domain::models::{CallWeight, InvokerConfig};
use crate::services::events::{emit, EventSender, RunEvent};

enum Attempt<T> {
    Ok(T),
    TimedOut,
    Failed(ServiceError),
}

/// Wraps one outbound call with segmented timeout and bounded retry.
#[derive(Clone)]
pub struct ResilientInvoker {
    segment: Duration,
    max_segments: u32,
    max_retries: u32,
    backoff: Duration,
    events: Option<EventSender>,
}

impl ResilientInvoker {
    pub fn new(segment: Duration, max_segments: u32, max_retries: u32, backoff: Duration) -> Self {
        Self {
            segment,
            max_segments: max_segments.max(1),
            max_retries,
            backoff,
            events: None,
        }
    }

    /// Build an invoker for a call weight from the shared config.
    pub fn for_weight(config: &InvokerConfig, weight: CallWeight) -> Self {
        Self::new(
            Duration::from_secs(config.segment_secs(weight)),
            config.max_segments,
            config.retries(weight),
            Duration::from_millis(config.backoff_ms),
        )
    }

    /// Attach a heartbeat side-channel. Heartbeats report elapsed segments
    /// and never influence success or failure.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Execute `operation`, re-issuing it on transport faults while the
    /// retry budget lasts.
    ///
    /// Total wait is bounded by segment x max_segments per attempt plus
    /// max_retries x backoff between attempts.
    ///
    /// # Errors
    /// `InvokeError::Timeout` after `max_segments` elapsed windows;
    /// `InvokeError::Exhausted` when the call failed and no retries remain.
    pub async fn invoke<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, InvokeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.attempt(label, operation()).await {
                Attempt::Ok(value) => {
                    if attempts > 1 {
                        debug!(label, attempts, "call succeeded after retry");
                    }
                    return Ok(value);
                }
                Attempt::TimedOut => {
                    warn!(
                        label,
                        segments = self.max_segments,
                        segment_secs = self.segment.as_secs(),
                        "call abandoned after exhausting timeout segments"
                    );
                    return Err(InvokeError::Timeout {
                        segments: self.max_segments,
                        segment_secs: self.segment.as_secs(),
                    });
                }
                Attempt::Failed(err) => {
                    if err.is_transport() && attempts <= self.max_retries {
                        warn!(
                            label,
                            attempt = attempts,
                            error = %err,
                            backoff_ms = self.backoff.as_millis() as u64,
                            "transport fault, retrying after backoff"
                        );
                        sleep(self.backoff).await;
                        continue;
                    }
                    return Err(InvokeError::Exhausted {
                        attempts,
                        source: err,
                    });
                }
            }
        }
    }

    /// One attempt: wait in segment-sized windows until the call settles or
    /// the window budget is spent.
    async fn attempt<T>(
        &self,
        label: &str,
        call: impl Future<Output = Result<T, ServiceError>>,
    ) -> Attempt<T> {
        tokio::pin!(call);
        let mut elapsed_segments: u32 = 0;
        loop {
            match timeout(self.segment, &mut call).await {
                Ok(Ok(value)) => return Attempt::Ok(value),
                Ok(Err(err)) => return Attempt::Failed(err),
                Err(_) => {
                    elapsed_segments += 1;
                    if let Some(events) = &self.events {
                        emit(
                            events,
                            RunEvent::CallWaiting {
                                label: label.to_string(),
                                segment: elapsed_segments,
                                max_segments: self.max_segments,
                            },
                        );
                    }
                    if elapsed_segments >= self.max_segments {
                        return Attempt::TimedOut;
                    }
                    debug!(
                        label,
                        segment = elapsed_segments,
                        max_segments = self.max_segments,
                        "segment elapsed, still waiting on remote operation"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn fast_invoker(max_segments: u32, max_retries: u32) -> ResilientInvoker {
        ResilientInvoker::new(
            Duration::from_secs(1),
            max_segments,
            max_retries,
            Duration::from_secs(2),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let invoker = fast_invoker(3, 2);
        let calls = Arc::new(AtomicU32::new(0));

        let result = invoker
            .invoke("quote", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ServiceError>(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_survives_segments_below_budget() {
        let invoker = fast_invoker(3, 0);

        // Takes 2.5 segments; budget is 3, so the invoker keeps waiting.
        let result = invoker
            .invoke("slow", || async {
                sleep(Duration::from_millis(2500)).await;
                Ok::<_, ServiceError>("done")
            })
            .await;

        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_max_segments_without_retry() {
        let invoker = fast_invoker(3, 2);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = invoker
            .invoke("hung", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    futures::future::pending::<Result<(), ServiceError>>().await
                }
            })
            .await;

        match result {
            Err(InvokeError::Timeout { segments, .. }) => assert_eq!(segments, 3),
            other => panic!("expected timeout, got {other:?}"),
        }
        // Timeouts do not consume the retry budget.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_fault_retries_then_succeeds() {
        let invoker = fast_invoker(3, 2);
        let calls = Arc::new(AtomicU32::new(0));

        let result = invoker
            .invoke("flaky", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ServiceError::Transport("connection reset".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_makes_at_most_r_plus_one_attempts() {
        let invoker = fast_invoker(3, 2);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = invoker
            .invoke("down", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::Transport("refused".into()))
                }
            })
            .await;

        match result {
            Err(InvokeError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_response_is_not_retried() {
        let invoker = fast_invoker(3, 2);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = invoker
            .invoke("degraded", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ServiceError::Degraded("internal timeout".into()))
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(InvokeError::Exhausted { attempts: 1, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_fails_on_first_transport_fault() {
        let invoker = fast_invoker(3, 0);

        let result: Result<(), _> = invoker
            .invoke("debate", || async {
                Err(ServiceError::Transport("reset".into()))
            })
            .await;

        assert!(matches!(
            result,
            Err(InvokeError::Exhausted { attempts: 1, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeats_are_emitted_per_elapsed_segment() {
        let (tx, mut rx) = mpsc::channel(16);
        let invoker = fast_invoker(2, 0).with_events(tx);

        let _ = invoker
            .invoke("hung", || async {
                futures::future::pending::<Result<(), ServiceError>>().await
            })
            .await;

        let mut heartbeats = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, RunEvent::CallWaiting { .. }) {
                heartbeats += 1;
            }
        }
        assert_eq!(heartbeats, 2);
    }
}
