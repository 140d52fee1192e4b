//! Debate domain types.
//!
//! A debate is a structured multi-party exchange run by an external service.
//! The directional debate pits two sides against each other; the risk debate
//! runs three. The coordinator reduces either to a `DebateConclusion`.

use serde::{Deserialize, Serialize};

/// Which debate sub-workflow is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateKind {
    /// Bull vs. bear on direction.
    Directional,
    /// Aggressive / neutral / conservative on risk posture.
    Risk,
}

impl DebateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directional => "directional",
            Self::Risk => "risk",
        }
    }

    /// Side labels in speaking order.
    pub fn sides(&self) -> &'static [&'static str] {
        match self {
            Self::Directional => &["bull", "bear"],
            Self::Risk => &["aggressive", "neutral", "conservative"],
        }
    }

    pub fn side_count(&self) -> usize {
        self.sides().len()
    }
}

/// One turn of the exchange as reported by the debate service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebateRound {
    pub side: String,
    pub content: String,
    pub round: u32,
}

/// Conclusion label. Directional debates classify into the bull/bear/mixed
/// family, risk debates into the risk family; `InsufficientData` is the
/// shared fallback escape when no signal exists at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConclusionLabel {
    BullLeaning,
    BearLeaning,
    Mixed,
    RiskElevated,
    RiskContained,
    Balanced,
    InsufficientData,
}

impl ConclusionLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BullLeaning => "bull-leaning",
            Self::BearLeaning => "bear-leaning",
            Self::Mixed => "mixed",
            Self::RiskElevated => "risk-elevated",
            Self::RiskContained => "risk-contained",
            Self::Balanced => "balanced",
            Self::InsufficientData => "insufficient-data",
        }
    }
}

/// The distilled position of one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideView {
    pub side: String,
    pub core_view: String,
}

/// Final product of a debate, whether from the service or the local fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateConclusion {
    pub kind: DebateKind,
    pub label: ConclusionLabel,
    /// 0..=100.
    pub score: u8,
    pub synthesis: String,
    pub views: Vec<SideView>,
    /// True when the conclusion came from the deterministic local fallback.
    #[serde(default)]
    pub degraded: bool,
}

/// Fixed lookup from the service's categorical verdict to a label and score.
///
/// Unknown categories return `None`, which the coordinator treats the same
/// as a degraded response.
pub fn map_verdict(kind: DebateKind, verdict: &str) -> Option<(ConclusionLabel, u8)> {
    let normalized = verdict.trim().to_lowercase().replace([' ', '-'], "_");
    match kind {
        DebateKind::Directional => match normalized.as_str() {
            "strong_buy" => Some((ConclusionLabel::BullLeaning, 88)),
            "buy" => Some((ConclusionLabel::BullLeaning, 72)),
            "hold" => Some((ConclusionLabel::Mixed, 50)),
            "sell" => Some((ConclusionLabel::BearLeaning, 28)),
            "strong_sell" => Some((ConclusionLabel::BearLeaning, 12)),
            _ => None,
        },
        DebateKind::Risk => match normalized.as_str() {
            "low" => Some((ConclusionLabel::RiskContained, 20)),
            "moderate" | "medium" => Some((ConclusionLabel::Balanced, 50)),
            "high" => Some((ConclusionLabel::RiskElevated, 80)),
            _ => None,
        },
    }
}
