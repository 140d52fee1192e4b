//! Collaborator ports.
//!
//! Services depend on these traits, never on concrete adapters; the HTTP and
//! file implementations live under `infrastructure`.

pub mod analysis_service;
pub mod debate_service;
pub mod enrichment;
pub mod session_store;
pub mod snapshot_store;

pub use analysis_service::{AnalysisRequest, AnalysisResponse, AnalysisService};
pub use debate_service::{DebateRequest, DebateResponse, DebateService};
pub use enrichment::{CitationProvider, MarketDataProvider};
pub use session_store::{RemoteSessionStatus, SessionStore};
pub use snapshot_store::SnapshotStore;
