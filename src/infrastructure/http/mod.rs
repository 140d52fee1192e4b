//! HTTP implementations of the collaborator ports.
//!
//! All clients share the same construction pattern: a pooled reqwest client
//! with no request timeout of its own. Deadlines are owned entirely by the
//! resilient invoker; a client-level timeout would fight the segment budget.

mod analysis;
mod debate;
mod market;
mod session;

pub use analysis::HttpAnalysisService;
pub use debate::HttpDebateService;
pub use market::{HttpCitationProvider, HttpMarketDataProvider};
pub use session::HttpSessionStore;

use crate::domain::errors::ServiceError;

/// Build the shared client shape used by every adapter.
fn build_client() -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .pool_max_idle_per_host(10)
        .tcp_nodelay(true)
        .build()
        .map_err(|err| ServiceError::Transport(err.to_string()))
}

/// Map a reqwest failure to the service error taxonomy.
fn transport(err: reqwest::Error) -> ServiceError {
    ServiceError::Transport(err.to_string())
}

/// Reject non-2xx statuses before parsing.
fn check_status(response: &reqwest::Response) -> Result<(), ServiceError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ServiceError::Status(status.as_u16()))
    }
}
