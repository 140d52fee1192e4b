//! `delphi resume`: continue an interrupted run.

use anyhow::Result;
use tokio::sync::mpsc;

use crate::application::ResumeOutcome;
use crate::cli::{render, ResumeArgs};
use crate::domain::models::Config;

use super::build_pipeline;

pub async fn execute(_args: ResumeArgs, config: Config, json: bool) -> Result<()> {
    let (tx, rx) = mpsc::channel(256);
    let pipeline = build_pipeline(&config, tx)?;
    let renderer = tokio::spawn(render::consume(rx, json));

    let result = pipeline.resume().await;
    drop(pipeline);
    let _ = renderer.await;

    match result? {
        ResumeOutcome::Resumed(report) => {
            render::print_report(&report, json);
        }
        ResumeOutcome::LocalStateOnly(snapshot) => {
            if !json {
                eprintln!(
                    "remote session unreachable; showing the last local snapshot \
                     (the run itself cannot be continued from it)"
                );
            }
            render::print_snapshot(&snapshot, json);
        }
    }
    Ok(())
}
