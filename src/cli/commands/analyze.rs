//! `delphi analyze <code>`: run the full pipeline.

use anyhow::Result;
use tokio::sync::mpsc;

use crate::cli::{render, AnalyzeArgs};
use crate::domain::models::Config;

use super::build_pipeline;

pub async fn execute(args: AnalyzeArgs, config: Config, json: bool) -> Result<()> {
    let (tx, rx) = mpsc::channel(256);
    let pipeline = build_pipeline(&config, tx)?;
    let renderer = tokio::spawn(render::consume(rx, json));

    let result = pipeline.run(&args.code).await;
    // Dropping the pipeline releases the last event sender so the renderer
    // drains and exits.
    drop(pipeline);
    let _ = renderer.await;

    let report = result?;
    render::print_report(&report, json);
    Ok(())
}
