//! # Lecture Transcripts service (`ltx`)
//!
//! ## Usage
//!
//! ```bash
//! ltx --config ./config/ltx.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ltx init` | Create the SQLite database and transcript schema |
//! | `ltx serve` | Start the transcript HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lecture_transcripts::{config, logging, migrate, server};

/// Lecture Transcripts: timed-text ingestion for lecture discussions.
#[derive(Parser)]
#[command(name = "ltx", version, about = "Lecture transcript ingestion service")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ltx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized at {}", cfg.db.path.display());
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
