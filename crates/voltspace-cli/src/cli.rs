//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// VoltSpace - Home energy insights, assistant and floor-plan models
#[derive(Parser)]
#[command(name = "voltspace")]
#[command(about = "Smart-home energy insights service", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Directory served under /static (generated models land in models/)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Print insights for a device snapshot
    Insights {
        /// JSON file with a list of devices
        #[arg(short, long)]
        file: PathBuf,

        /// Ask the text-generation service, falling back to the rules
        #[arg(long)]
        ai: bool,

        /// Evaluate at this RFC 3339 time instead of now
        #[arg(long)]
        at: Option<String>,
    },

    /// Ask the energy assistant a question
    Ask {
        /// The question
        question: String,

        /// File with dashboard context (JSON or plain text)
        #[arg(short, long)]
        context: Option<PathBuf>,
    },

    /// Convert a floor-plan image into a 3D model
    Meshify {
        /// PNG or JPEG image
        #[arg(short, long)]
        image: PathBuf,

        /// Subject hint
        #[arg(long)]
        hint: Option<String>,
    },

    /// Show the resolved configuration (credentials masked)
    Config,
}
