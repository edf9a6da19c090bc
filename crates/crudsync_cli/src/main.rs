//! crudsync CLI
//!
//! Command-line tools for inspecting persisted crudsync state.
//!
//! # Commands
//!
//! - `inspect` - Summarize a snapshot: entities, statuses, queries, editors
//! - `pending` - List work that reconciliation would still push or resubmit

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// crudsync snapshot tools.
#[derive(Parser)]
#[command(name = "crudsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a state snapshot
    Inspect {
        /// Path to the snapshot file
        snapshot: PathBuf,

        /// List every query slot with its ids
        #[arg(short, long)]
        queries: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List modified entities and failed posts awaiting resubmission
    Pending {
        /// Path to the snapshot file
        snapshot: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect {
            snapshot,
            queries,
            format,
        } => {
            commands::inspect::run(&snapshot, queries, &format)?;
        }
        Commands::Pending { snapshot, format } => {
            commands::pending::run(&snapshot, &format)?;
        }
        Commands::Version => {
            println!("crudsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
