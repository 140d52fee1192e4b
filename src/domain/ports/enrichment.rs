/// Enrichment collaborator ports: citations and market data.
///
/// Both are best-effort. Citation failures are swallowed by the task runner
/// and replaced by a deterministic placeholder; a missing market snapshot is
/// the one enrichment failure that is fatal (unrecoverable precondition).
use async_trait::async_trait;

use crate::domain::errors::ServiceError;
use crate::domain::models::{Citation, MarketSnapshot};

/// Best-effort citation metadata provider, keyed to specific tasks.
#[async_trait]
pub trait CitationProvider: Send + Sync {
    /// Provider name, used in logs and placeholder attribution.
    fn name(&self) -> &str;

    /// Fetch citation metadata for one task.
    ///
    /// # Errors
    /// Returns `ServiceError` on any fault; callers tolerate all of them.
    async fn citations(
        &self,
        task_id: &str,
        stock_code: &str,
    ) -> Result<Vec<Citation>, ServiceError>;
}

/// Market quote provider.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetch a point-in-time snapshot for a stock code.
    ///
    /// # Errors
    /// Returns `ServiceError` when no quote can be obtained; the pipeline
    /// treats that as an unrecoverable precondition.
    async fn snapshot(&self, stock_code: &str) -> Result<MarketSnapshot, ServiceError>;
}
