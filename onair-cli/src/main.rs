//! OnAir command-line interface.

mod error;
mod runner;
mod synthetic;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "onair", version = onair::VERSION, about = "Live-stream companion: event ingestion, overlay and TTS")]
struct Cli {
    /// Path to config.ini (default: ~/.onair/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the companion (default)
    Run {
        /// Feed synthetic platform events instead of real adapters
        #[arg(long)]
        synthetic: bool,
    },
    /// Validate the configuration and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Run { synthetic: false }) {
        Command::Run { synthetic } => runner::run(cli.config, synthetic).await,
        Command::CheckConfig => runner::check_config(cli.config),
    };

    if let Err(error) = result {
        error.exit();
    }
}
