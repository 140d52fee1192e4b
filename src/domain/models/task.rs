//! Analysis task domain model.
//!
//! Tasks are the discrete units of the pipeline. Each produces one textual
//! analysis artifact and moves through a small monotonic state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::{DomainError, DomainResult};

/// State of a task within one pipeline run.
///
/// Transitions are monotonic for the lifetime of a run: a task only moves
/// forward, and is reset to `Idle` solely by recreating it at run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Not yet dispatched.
    Idle,
    /// Gathering citation metadata from enrichment collaborators.
    Fetching,
    /// Remote analysis call in flight.
    Analyzing,
    /// Completed with a non-empty output document.
    Success,
    /// Failed; output holds a diagnostic template.
    Error,
}

impl Default for TaskState {
    fn default() -> Self {
        Self::Idle
    }
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Analyzing => "analyzing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "idle" => Some(Self::Idle),
            "fetching" => Some(Self::Fetching),
            "analyzing" => Some(Self::Analyzing),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Valid transitions from this state.
    ///
    /// `Idle -> Success` is permitted for the resume-merge path, where a
    /// completed result pulled from the remote session is applied directly.
    pub fn valid_transitions(&self) -> Vec<TaskState> {
        match self {
            Self::Idle => vec![Self::Fetching, Self::Success],
            Self::Fetching => vec![Self::Analyzing, Self::Error],
            Self::Analyzing => vec![Self::Success, Self::Error],
            Self::Success => vec![],
            Self::Error => vec![],
        }
    }

    pub fn can_transition_to(&self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Outbound call weight, mapped to a segment timeout by the invoker config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallWeight {
    /// Cheap data pulls.
    Light,
    /// Ordinary single-document analysis.
    Standard,
    /// Expensive synthesis over many prior outputs.
    Heavy,
    /// Multi-party debate calls. Never retried.
    Debate,
}

/// One entry of the cosmetic progress log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub icon: String,
    pub label: String,
}

/// Citation metadata attached to a task by enrichment collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub name: String,
    pub count: u32,
    pub description: String,
}

/// A single pipeline task and its per-run mutable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTask {
    /// Registry key, stable across runs.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Stage ordinal (1..=4).
    pub stage: u8,
    /// Step ordinal within the stage (stage 1 has steps 1..=3).
    pub step: u8,
    /// Group label, selects the progress script and report section.
    pub group: String,
    /// Current state.
    pub state: TaskState,
    /// Output document; empty until success, diagnostic template on error.
    pub output: String,
    /// Rough token estimate of the output, floor(len / 1.5).
    pub token_estimate: u64,
    /// Ordered cosmetic progress entries.
    pub progress: Vec<ProgressEntry>,
    /// Citation list gathered during the fetching phase.
    pub citations: Vec<Citation>,
    /// When the task left `Idle`.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisTask {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        stage: u8,
        step: u8,
        group: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            stage,
            step,
            group: group.into(),
            state: TaskState::default(),
            output: String::new(),
            token_estimate: 0,
            progress: Vec::new(),
            citations: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Transition to a new state, enforcing monotonicity.
    pub fn transition_to(&mut self, next: TaskState) -> DomainResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.state.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        if self.state == TaskState::Idle {
            self.started_at = Some(Utc::now());
        }
        self.state = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Token estimate used for completed outputs: floor(len / 1.5).
pub fn estimate_tokens(output: &str) -> u64 {
    (output.chars().count() as u64 * 2) / 3
}
