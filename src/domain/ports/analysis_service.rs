/// Analysis service port (trait) for dependency injection.
///
/// The analysis service performs the actual inference for one task. The core
/// never implements it; it only sequences and survives it.
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::ServiceError;
use crate::domain::models::MarketSnapshot;

/// Request for one task's analysis.
///
/// `prior_outputs` is a point-in-time copy taken when the request is built,
/// never a live reference to run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub task_id: String,
    pub stock_code: String,
    pub market: MarketSnapshot,
    pub prior_outputs: BTreeMap<String, String>,
    pub instruction: String,
}

/// Successful analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub output: String,
}

/// Remote analysis collaborator.
///
/// Implementations must tolerate retries: the invoker may re-issue an
/// identical request after a transport fault.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Run one task's analysis.
    ///
    /// # Errors
    /// Returns `ServiceError` on transport faults, unexpected statuses,
    /// malformed payloads, or when the collaborator reports degradation.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ServiceError>;
}
