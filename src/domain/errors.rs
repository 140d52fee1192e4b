//! Domain errors for the delphi pipeline.

use thiserror::Error;

/// Errors returned by external collaborators (analysis, debate, session
/// store, market and citation providers).
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Protocol(String),

    #[error("collaborator degraded: {0}")]
    Degraded(String),
}

impl ServiceError {
    /// Transport-level faults (and 5xx responses) are the only class the
    /// invoker retries. Degraded and protocol failures are answers, not
    /// faults; retrying them wastes the time budget.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(code) => *code >= 500,
            Self::Protocol(_) | Self::Degraded(_) => false,
        }
    }
}

/// Terminal outcome of a resilient invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The call exhausted all timeout segments without completing.
    #[error("call timed out after {segments} segment(s) of {segment_secs}s")]
    Timeout { segments: u32, segment_secs: u64 },

    /// The call failed and the retry budget is spent.
    #[error("call failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ServiceError,
    },
}

/// Domain-level errors. Only `Validation` and `Precondition` ever surface to
/// the user; everything else is contained by the owning component.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
