//! Command-line interface. Thin glue: parses arguments, wires the HTTP
//! adapters into the pipeline, and renders the run event stream.

pub mod commands;
pub mod render;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "delphi",
    about = "Staged stock-analysis pipeline with debate synthesis",
    version
)]
pub struct Cli {
    /// Emit machine-readable json instead of styled output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from a specific file instead of .delphi/.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the full analysis pipeline for a stock code.
    Analyze(AnalyzeArgs),
    /// Resume an interrupted run from the live remote session.
    Resume(ResumeArgs),
    /// Show the locally snapshotted state of the current session.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Six-digit stock code, e.g. 600000.
    pub code: String,
}

#[derive(Debug, Args)]
pub struct ResumeArgs {}

#[derive(Debug, Args)]
pub struct StatusArgs {}

/// Print an error and exit non-zero.
pub fn handle_error(err: anyhow::Error, json: bool) {
    if json {
        let payload = serde_json::json!({ "error": format!("{err:#}") });
        eprintln!("{payload}");
    } else {
        eprintln!("{} {err:#}", console::style("error:").red().bold());
    }
    std::process::exit(1);
}
