//! Delphi CLI entry point.

use clap::Parser;

use delphi::cli::{Cli, Commands};
use delphi::infrastructure::{logging, ConfigLoader};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_ref() {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            delphi::cli::handle_error(err, cli.json);
            return;
        }
    };

    let _guard = logging::init(&config.logging);

    let result = match cli.command {
        Commands::Analyze(args) => {
            delphi::cli::commands::analyze::execute(args, config, cli.json).await
        }
        Commands::Resume(args) => {
            delphi::cli::commands::resume::execute(args, config, cli.json).await
        }
        Commands::Status(args) => {
            delphi::cli::commands::status::execute(args, config, cli.json).await
        }
    };

    if let Err(err) = result {
        delphi::cli::handle_error(err, cli.json);
    }
}
