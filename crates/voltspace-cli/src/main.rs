//! VoltSpace CLI - Smart-home energy insights
//!
//! Usage:
//!   voltspace serve --port 8000          Start web server
//!   voltspace insights --file devs.json  Print rule-based insights
//!   voltspace ask "How do I save?"       Ask the energy assistant
//!   voltspace meshify --image plan.png   Convert a floor plan to a model
//!   voltspace config                     Show resolved configuration

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            port,
            host,
            static_dir,
        } => commands::cmd_serve(config, host, port, static_dir).await,
        Commands::Insights { file, ai, at } => {
            commands::cmd_insights(&config, &file, ai, at.as_deref()).await
        }
        Commands::Ask { question, context } => {
            commands::cmd_ask(&config, &question, context.as_deref()).await
        }
        Commands::Meshify { image, hint } => {
            commands::cmd_meshify(&config, &image, hint.as_deref()).await
        }
        Commands::Config => commands::cmd_config(&config, cli.config.as_deref()),
    }
}
