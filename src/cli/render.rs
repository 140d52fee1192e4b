//! Rendering of the run event stream and final artifacts.

use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;
use tokio::sync::mpsc;

use crate::application::RunReport;
use crate::domain::models::Snapshot;
use crate::services::RunEvent;

/// Consume the event stream until every sender is dropped.
pub async fn consume(mut rx: mpsc::Receiver<RunEvent>, json: bool) {
    while let Some(event) = rx.recv().await {
        if json {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{line}");
            }
            continue;
        }
        render_event(&event);
    }
}

fn render_event(event: &RunEvent) {
    match event {
        RunEvent::RunStarted {
            session_id,
            stock_code,
        } => {
            println!(
                "{} analyzing {} (session {})",
                style("▶").cyan(),
                style(stock_code).bold(),
                session_id
            );
        }
        RunEvent::StageStarted {
            stage,
            label,
            task_count,
            ..
        } => {
            println!(
                "{} stage {} [{}] with {} task(s)",
                style("■").blue(),
                stage,
                label,
                task_count
            );
        }
        RunEvent::BatchStarted {
            batch, batch_count, ..
        } => {
            println!("  batch {batch}/{batch_count}");
        }
        RunEvent::StageCompleted {
            stage,
            succeeded,
            failed,
            ..
        } => {
            println!(
                "{} stage {} settled: {} ok, {} failed",
                style("■").blue(),
                stage,
                style(succeeded).green(),
                if *failed > 0 {
                    style(failed).red()
                } else {
                    style(failed).dim()
                }
            );
        }
        RunEvent::TaskProgress {
            task_id,
            icon,
            label,
        } => {
            println!("  {icon} {task_id}: {label}");
        }
        RunEvent::TaskCompleted {
            task_id,
            token_estimate,
        } => {
            println!(
                "  {} {task_id} (~{token_estimate} tokens)",
                style("✔").green()
            );
        }
        RunEvent::TaskFailed { task_id, error } => {
            println!("  {} {task_id}: {error}", style("✘").red());
        }
        RunEvent::CallWaiting {
            label,
            segment,
            max_segments,
        } => {
            println!(
                "  {} {label} still running (window {segment}/{max_segments})",
                style("…").yellow()
            );
        }
        RunEvent::DebateStarted { kind, sides, rounds } => {
            println!(
                "{} {} debate: {} sides, {} round(s)",
                style("⚔").magenta(),
                kind.as_str(),
                sides,
                rounds
            );
        }
        RunEvent::DebateConcluded {
            kind,
            label,
            score,
            degraded,
        } => {
            println!(
                "{} {} debate concluded: {} (score {}){}",
                style("⚔").magenta(),
                kind.as_str(),
                style(label.as_str()).bold(),
                score,
                if *degraded { " [local fallback]" } else { "" }
            );
        }
        RunEvent::ResultMerged { task_id } => {
            println!("  {} merged remote result for {task_id}", style("⇣").cyan());
        }
        RunEvent::SessionCompleted { status, .. } => {
            println!("{} session {}", style("●").cyan(), status.as_str());
        }
        RunEvent::RunAborted { reason } => {
            println!("{} run aborted: {reason}", style("✘").red().bold());
        }
        RunEvent::RunCompleted { session_id } => {
            println!("{} run {} complete", style("✔").green().bold(), session_id);
        }
        // Task starts and snapshot writes are noise at the console.
        RunEvent::TaskStarted { .. } | RunEvent::SnapshotSaved { .. } => {}
    }
}

/// Print the final report with a conclusion summary table.
pub fn print_report(report: &RunReport, json: bool) {
    if json {
        let payload = serde_json::json!({
            "session_id": report.session_id,
            "stock_code": report.stock_code,
            "completed": report.completed,
            "failed": report.failed,
            "conclusions": report.conclusions,
            "document": report.document,
        });
        println!("{payload}");
        return;
    }

    if !report.conclusions.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Debate", "Label", "Score", "Source"]);
        for conclusion in &report.conclusions {
            table.add_row(vec![
                Cell::new(conclusion.kind.as_str()),
                Cell::new(conclusion.label.as_str()),
                Cell::new(conclusion.score),
                Cell::new(if conclusion.degraded {
                    "local fallback"
                } else {
                    "debate service"
                }),
            ]);
        }
        println!("{table}");
    }
    println!("{}", report.document);
}

/// Render a snapshotted session as a task state table.
pub fn print_snapshot(snapshot: &Snapshot, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string_pretty(snapshot) {
            println!("{line}");
        }
        return;
    }

    println!(
        "session {} for {} ({})",
        style(&snapshot.session.id).bold(),
        snapshot.session.stock_code,
        snapshot.session.status.as_str()
    );
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Task", "Stage", "State", "Tokens"]);
    for task in &snapshot.tasks {
        table.add_row(vec![
            Cell::new(&task.id),
            Cell::new(format!("{}.{}", task.stage, task.step)),
            Cell::new(task.state.as_str()),
            Cell::new(task.token_estimate),
        ]);
    }
    println!("{table}");
}
