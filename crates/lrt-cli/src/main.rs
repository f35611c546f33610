//! Thin command-line front door over the engine crate: drives a session
//! end-to-end without any of the library crates knowing a CLI exists.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lrt", about = "Legal Register Table scrape and cascade engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Root directory for session scratchpads.
    #[arg(long, global = true, default_value = "sessions")]
    sessions_root: String,

    /// Base URL for the upstream legislation registry.
    #[arg(long, global = true, default_value = "https://www.legislation.gov.uk")]
    base_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape and parse a batch of citations for a session keyed by date.
    Scrape {
        /// Date (or date range label) that keys the session directory.
        date: String,
        /// Citation short paths to parse, e.g. `uksi/2024/1`.
        #[arg(long = "citation", required = true)]
        citations: Vec<String>,
    },
    /// Inspect an existing session's scratchpad.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Drive cascade bookkeeping for a session.
    Cascade {
        #[command(subcommand)]
        action: CascadeAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Print every scratchpad file recorded for a session.
    Show { id: String },
}

#[derive(Subcommand)]
enum CascadeAction {
    /// List the cascade entries recorded for a session's run.
    Sweep { session: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::new(log_level))
        .init();

    let session_store = lrt_engine::SessionStore::new(&cli.sessions_root);

    match cli.command {
        Commands::Scrape { date, citations } => {
            commands::handle_scrape(&date, &citations, &cli.base_url, &session_store).await
        }
        Commands::Session {
            action: SessionAction::Show { id },
        } => commands::handle_session_show(&id, &session_store).await,
        Commands::Cascade {
            action: CascadeAction::Sweep { session },
        } => commands::handle_cascade_sweep(&session, &cli.base_url, &session_store).await,
    }
}
