//! Report assembler.
//!
//! Folds completed task outputs and debate conclusions into one plain
//! markdown document. Pure formatting over run state; rendering and export
//! live elsewhere.

use crate::domain::models::TaskState;
use crate::services::context::RunContext;

pub struct ReportAssembler;

impl ReportAssembler {
    /// Assemble the final document in catalogue order. Always non-empty:
    /// failed tasks contribute a short note instead of a section body.
    pub async fn assemble(ctx: &RunContext) -> String {
        let tasks = ctx.tasks_in_order().await;
        let conclusions = ctx.conclusions().await;

        let mut doc = String::new();
        doc.push_str(&format!(
            "# Analysis report: {} ({})\n\n",
            ctx.market.name, ctx.stock_code
        ));
        doc.push_str(&format!(
            "Last price {:.2}, day change {:+.2}%, session `{}`.\n",
            ctx.market.price, ctx.market.change_percent, ctx.session_id
        ));

        let mut current_section = (0u8, 0u8);
        let mut total_tokens: u64 = 0;
        for task in &tasks {
            if (task.stage, task.step) != current_section {
                current_section = (task.stage, task.step);
                doc.push_str(&format!(
                    "\n## Stage {} · {}\n",
                    task.stage,
                    section_title(&task.group)
                ));
            }
            match task.state {
                TaskState::Success => {
                    doc.push_str(&format!("\n### {}\n\n{}\n", task.title, task.output));
                    total_tokens += task.token_estimate;
                }
                TaskState::Error => {
                    doc.push_str(&format!(
                        "\n### {}\n\n_{}_\n",
                        task.title,
                        if task.output.is_empty() {
                            "analysis unavailable"
                        } else {
                            task.output.as_str()
                        }
                    ));
                }
                _ => {
                    doc.push_str(&format!("\n### {}\n\n_not completed_\n", task.title));
                }
            }
        }

        if !conclusions.is_empty() {
            doc.push_str("\n## Debate conclusions\n");
            for conclusion in &conclusions {
                doc.push_str(&format!(
                    "\n### {} debate: {} (score {}{})\n\n{}\n",
                    capitalize(conclusion.kind.as_str()),
                    conclusion.label.as_str(),
                    conclusion.score,
                    if conclusion.degraded {
                        ", local fallback"
                    } else {
                        ""
                    },
                    conclusion.synthesis
                ));
                for view in &conclusion.views {
                    doc.push_str(&format!("- **{}**: {}\n", view.side, view.core_view));
                }
            }
        }

        let cited: Vec<_> = tasks
            .iter()
            .flat_map(|task| task.citations.iter())
            .collect();
        if !cited.is_empty() {
            doc.push_str("\n## Sources\n\n");
            for citation in cited {
                doc.push_str(&format!(
                    "- {} ({} reference(s)): {}\n",
                    citation.name, citation.count, citation.description
                ));
            }
        }

        doc.push_str(&format!("\nEstimated output tokens: {total_tokens}\n"));
        doc
    }
}

fn section_title(group: &str) -> &str {
    match group {
        "collect" => "Data collection",
        "context" => "Industry and macro context",
        "deep" => "Deep analysis",
        "perspective" => "Market perspective",
        "valuation" => "Valuation and risk",
        "strategy" => "Strategy",
        other => other,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        ConclusionLabel, DebateConclusion, DebateKind, MarketSnapshot, TaskState,
    };
    use chrono::Utc;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn ctx() -> Arc<RunContext> {
        let (tx, _rx) = mpsc::channel(256);
        Arc::new(RunContext::new(
            "sess-1",
            "600000",
            MarketSnapshot {
                code: "600000".to_string(),
                name: "SPD Bank".to_string(),
                price: 8.42,
                change_percent: 1.2,
                turnover: 1_000_000.0,
                pe_ratio: Some(6.1),
                pb_ratio: Some(0.8),
                captured_at: Utc::now(),
            },
            tx,
        ))
    }

    #[tokio::test]
    async fn test_report_is_never_empty() {
        let doc = ReportAssembler::assemble(&ctx()).await;
        assert!(doc.contains("# Analysis report: SPD Bank (600000)"));
        assert!(doc.contains("## Stage 1"));
    }

    #[tokio::test]
    async fn test_report_includes_outputs_errors_and_conclusions() {
        let ctx = ctx();
        ctx.merge_remote_result("price-history", "a clean uptrend").await;
        ctx.set_state("realtime-quote", TaskState::Fetching).await.unwrap();
        ctx.set_state("realtime-quote", TaskState::Analyzing).await.unwrap();
        ctx.record_error("realtime-quote", "quote feed down".to_string())
            .await
            .unwrap();
        ctx.push_conclusion(DebateConclusion {
            kind: DebateKind::Directional,
            label: ConclusionLabel::BullLeaning,
            score: 72,
            synthesis: "Bulls carried the exchange.".to_string(),
            views: vec![],
            degraded: false,
        })
        .await;

        let doc = ReportAssembler::assemble(&ctx).await;
        assert!(doc.contains("a clean uptrend"));
        assert!(doc.contains("quote feed down"));
        assert!(doc.contains("Directional debate: bull-leaning (score 72)"));
    }
}
