#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{reconstruct, run as run_cmd, serve};

/// MLentory CLI - run the ingestion pipeline, reconstruct model history, and
/// serve the search/graph API.
#[derive(Parser)]
#[command(name = "mlentory")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Unified MLentory CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the extraction → normalization → load pipeline for one platform.
    Run(run_cmd::RunArgs),

    /// Reconstruct a model's metadata as it stood at a given timestamp.
    Reconstruct(reconstruct::ReconstructArgs),

    /// Serve the search/graph HTTP API.
    Serve(serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_cmd::run(args).await,
        Commands::Reconstruct(args) => reconstruct::run(args).await,
        Commands::Serve(args) => serve::run(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_successfully() {
        Cli::command().debug_assert();
    }
}
