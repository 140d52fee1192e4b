/// Debate service port (trait) for dependency injection.
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ServiceError;
use crate::domain::models::{DebateKind, DebateRound};

/// Request for a multi-party debate over the accumulated outputs.
///
/// `outputs` is a point-in-time copy of completed task outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRequest {
    pub stock_code: String,
    pub outputs: BTreeMap<String, String>,
    pub kind: DebateKind,
    pub rounds: u32,
}

/// Raw debate result before the coordinator reduces it to a conclusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateResponse {
    pub side_views: Vec<DebateRound>,
    /// Categorical verdict: a recommendation for directional debates, a
    /// risk level for risk debates.
    pub verdict: String,
    pub summary: String,
    /// Set when the service completed but flags its own result as degraded
    /// (e.g. an internal timeout). Treated as a failure by the coordinator.
    #[serde(default)]
    pub degraded: bool,
}

/// Remote debate collaborator.
#[async_trait]
pub trait DebateService: Send + Sync {
    /// Run one debate exchange.
    ///
    /// # Errors
    /// Returns `ServiceError` on transport faults, unexpected statuses or
    /// malformed payloads. A degraded-but-delivered result is returned as
    /// `Ok` with the `degraded` flag set.
    async fn run_debate(&self, request: &DebateRequest) -> Result<DebateResponse, ServiceError>;
}
