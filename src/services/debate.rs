//! Debate coordinator.
//!
//! Runs one multi-party exchange through the invoker (debate weight, zero
//! retries) and reduces the response to a `DebateConclusion`. Any failure,
//! degraded flag, or unmappable verdict falls back to a deterministic local
//! heuristic over the prior task outputs and the market snapshot. A debate
//! failure never propagates past this module.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::domain::models::{
    map_verdict, CallWeight, ConclusionLabel, DebateConclusion, DebateConfig, DebateKind,
    InvokerConfig, MarketSnapshot, SideView,
};
use crate::domain::ports::{DebateRequest, DebateResponse, DebateService};
use crate::services::context::RunContext;
use crate::services::events::RunEvent;
use crate::services::invoker::ResilientInvoker;

/// Polarity vocabularies for the local fallback. Fixed: the fallback must be
/// deterministic for identical inputs.
const BULL_TERMS: &[&str] = &[
    "growth",
    "beat",
    "upgrade",
    "outperform",
    "expansion",
    "record high",
    "strong demand",
    "buyback",
    "accelerating",
    "margin improvement",
];

const BEAR_TERMS: &[&str] = &[
    "decline",
    "miss",
    "downgrade",
    "underperform",
    "contraction",
    "weak demand",
    "impairment",
    "overhang",
    "deteriorating",
    "liquidity pressure",
];

pub struct DebateCoordinator {
    service: Arc<dyn DebateService>,
    invoker_config: InvokerConfig,
    settings: DebateConfig,
}

impl DebateCoordinator {
    pub fn new(
        service: Arc<dyn DebateService>,
        invoker_config: InvokerConfig,
        settings: DebateConfig,
    ) -> Self {
        Self {
            service,
            invoker_config,
            settings,
        }
    }

    /// Run one debate. Always returns a usable conclusion.
    #[instrument(skip(self, ctx))]
    pub async fn run(&self, ctx: &Arc<RunContext>, kind: DebateKind) -> DebateConclusion {
        ctx.emit(RunEvent::DebateStarted {
            kind,
            sides: kind.side_count(),
            rounds: self.settings.rounds,
        });

        let outputs = ctx.completed_outputs().await;
        let request = DebateRequest {
            stock_code: ctx.stock_code.clone(),
            outputs: outputs.clone(),
            kind,
            rounds: self.settings.rounds,
        };

        let invoker = ResilientInvoker::for_weight(&self.invoker_config, CallWeight::Debate)
            .with_events(ctx.events());
        let service = Arc::clone(&self.service);
        let outcome = invoker
            .invoke(kind.as_str(), move || {
                let service = Arc::clone(&service);
                let request = request.clone();
                async move { service.run_debate(&request).await }
            })
            .await;

        let conclusion = match outcome {
            Ok(response) if !response.degraded => {
                match self.conclude(kind, &response) {
                    Some(conclusion) => conclusion,
                    None => {
                        warn!(
                            verdict = %response.verdict,
                            "unmappable debate verdict, using local fallback"
                        );
                        local_fallback(kind, &outputs, &ctx.market, &self.settings)
                    }
                }
            }
            Ok(_) => {
                warn!("debate service flagged its own result degraded, using local fallback");
                local_fallback(kind, &outputs, &ctx.market, &self.settings)
            }
            Err(err) => {
                warn!(error = %err, "debate call failed, using local fallback");
                local_fallback(kind, &outputs, &ctx.market, &self.settings)
            }
        };

        info!(
            label = conclusion.label.as_str(),
            score = conclusion.score,
            degraded = conclusion.degraded,
            "debate concluded"
        );
        ctx.emit(RunEvent::DebateConcluded {
            kind,
            label: conclusion.label,
            score: conclusion.score,
            degraded: conclusion.degraded,
        });
        conclusion
    }

    /// Reduce a healthy service response. `None` when the verdict is not in
    /// the lookup table.
    fn conclude(&self, kind: DebateKind, response: &DebateResponse) -> Option<DebateConclusion> {
        let (label, score) = map_verdict(kind, &response.verdict)?;
        let views = kind
            .sides()
            .iter()
            .map(|side| {
                let transcript = response
                    .side_views
                    .iter()
                    .filter(|round| round.side.eq_ignore_ascii_case(side))
                    .map(|round| round.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                SideView {
                    side: (*side).to_string(),
                    core_view: self.core_view(&transcript),
                }
            })
            .collect();
        Some(DebateConclusion {
            kind,
            label,
            score,
            synthesis: response.summary.clone(),
            views,
            degraded: false,
        })
    }

    /// Scan lines in reverse for the first substantive one: long enough and
    /// not a dialogue-turn marker. Falls back to a fixed-length truncation.
    fn core_view(&self, transcript: &str) -> String {
        for line in transcript.lines().rev() {
            let line = line.trim();
            if line.chars().count() >= self.settings.substantive_line_len
                && !is_turn_marker(line)
            {
                return line.to_string();
            }
        }
        truncate_chars(transcript.trim(), self.settings.core_view_max_len)
    }
}

fn is_turn_marker(line: &str) -> bool {
    line.starts_with('[')
        || line.starts_with('#')
        || line.ends_with(':')
        || line.to_ascii_lowercase().starts_with("round ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Deterministic local scoring over prior outputs and bounded market signals.
///
/// Identical inputs always produce the identical conclusion. When no signal
/// exists at all the result is an explicit insufficient-data conclusion,
/// never a fabricated one.
pub fn local_fallback(
    kind: DebateKind,
    outputs: &BTreeMap<String, String>,
    market: &MarketSnapshot,
    settings: &DebateConfig,
) -> DebateConclusion {
    let mut bull: i32 = 0;
    let mut bear: i32 = 0;
    let mut signals: u32 = 0;

    for text in outputs.values() {
        let lower = text.to_lowercase();
        for term in BULL_TERMS {
            let hits = lower.matches(term).count() as i32;
            if hits > 0 {
                // Per-term contribution is capped so one repetitive document
                // cannot dominate the score.
                bull += hits.min(3) * 2;
                signals += 1;
            }
        }
        for term in BEAR_TERMS {
            let hits = lower.matches(term).count() as i32;
            if hits > 0 {
                bear += hits.min(3) * 2;
                signals += 1;
            }
        }
    }

    // Bounded numeric signals: day change within sanity bounds.
    let change = market.change_percent;
    if change != 0.0 && change.is_finite() && change.abs() <= 30.0 {
        signals += 1;
        let weight = (change.abs() * 2.0).round().min(10.0) as i32;
        if change > 0.0 {
            bull += weight;
        } else {
            bear += weight;
        }
    }

    // Valuation ratio within sanity bounds.
    if let Some(pe) = market.pe_ratio {
        if pe > 0.0 && pe <= 300.0 {
            signals += 1;
            if pe < 18.0 {
                bull += 4;
            } else if pe > 60.0 {
                bear += 4;
            }
        }
    }

    if signals == 0 {
        return DebateConclusion {
            kind,
            label: ConclusionLabel::InsufficientData,
            score: 50,
            synthesis: "No usable signal in prior outputs or market data; no \
                        conclusion can be drawn."
                .to_string(),
            views: Vec::new(),
            degraded: true,
        };
    }

    bull = bull.clamp(0, 100);
    bear = bear.clamp(0, 100);
    let gap = bull - bear;

    let (label, score) = match kind {
        DebateKind::Directional => {
            let label = if gap > settings.decisive_gap {
                ConclusionLabel::BullLeaning
            } else if gap < -settings.decisive_gap {
                ConclusionLabel::BearLeaning
            } else {
                ConclusionLabel::Mixed
            };
            (label, (50 + gap).clamp(0, 100) as u8)
        }
        DebateKind::Risk => {
            let label = if bear - bull > settings.decisive_gap {
                ConclusionLabel::RiskElevated
            } else if bull - bear > settings.decisive_gap {
                ConclusionLabel::RiskContained
            } else {
                ConclusionLabel::Balanced
            };
            (label, (50 + (bear - bull)).clamp(0, 100) as u8)
        }
    };

    let views = kind
        .sides()
        .iter()
        .map(|side| SideView {
            side: (*side).to_string(),
            core_view: format!(
                "Heuristic tally for the {side} side from {count} scored document(s): \
                 positive {bull}, negative {bear}.",
                count = outputs.len(),
            ),
        })
        .collect();

    DebateConclusion {
        kind,
        label,
        score,
        synthesis: format!(
            "Local heuristic conclusion over {count} prior output(s): positive \
             signal {bull}, negative signal {bear}, classified as {label}.",
            count = outputs.len(),
            label = label.as_str(),
        ),
        views,
        degraded: true,
    }
}
