//! Local state snapshot for crash-resilient resume.
//!
//! The snapshot is a versioned serialized mirror of the in-memory run state.
//! Restores must stay forward compatible: unknown fields are ignored and
//! fields added after v1 carry serde defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::debate::DebateConclusion;
use super::session::Session;
use super::task::AnalysisTask;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 2;

/// Serialized mirror of one run: session, all task states, debate state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub session: Session,
    #[serde(default)]
    pub tasks: Vec<AnalysisTask>,
    #[serde(default)]
    pub conclusions: Vec<DebateConclusion>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
}

const fn default_version() -> u32 {
    1
}
