//! CLI command implementations.

pub mod analyze;
pub mod resume;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::AnalysisPipeline;
use crate::domain::models::Config;
use crate::infrastructure::{
    FileSnapshotStore, HttpAnalysisService, HttpDebateService, HttpMarketDataProvider,
    HttpSessionStore,
};
use crate::services::EventSender;

/// Wire the HTTP adapters and the file snapshot store into a pipeline.
pub fn build_pipeline(config: &Config, events: EventSender) -> Result<AnalysisPipeline> {
    let analysis = Arc::new(
        HttpAnalysisService::new(config.services.analysis_url.clone())
            .context("building analysis client")?,
    );
    let debate = Arc::new(
        HttpDebateService::new(config.services.debate_url.clone())
            .context("building debate client")?,
    );
    let sessions = Arc::new(
        HttpSessionStore::new(config.services.session_url.clone())
            .context("building session client")?,
    );
    let market = Arc::new(
        HttpMarketDataProvider::new(config.services.market_url.clone())
            .context("building market client")?,
    );
    let snapshots = Arc::new(FileSnapshotStore::new(
        config.continuity.snapshot_dir.clone(),
    ));

    Ok(AnalysisPipeline::new(
        analysis,
        debate,
        sessions,
        snapshots,
        market,
        config.clone(),
        events,
    ))
}
