//! SalesLog command line entry point.
//!
//! # Responsibility
//! - Load configuration (`.env`, optional TOML file, environment).
//! - Expose read-side reports and the interaction export over the store.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::info;
use saleslog_core::{
    core_version, dashboard_stats, export_interactions_csv, init_logging, open_db, search_all,
    AppConfig, SearchQuery,
};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "saleslog", version, about = "Sales tracking record store")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the configured database path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database and apply pending migrations.
    Init,
    /// Print dashboard counters as JSON.
    Stats,
    /// Search customers, deals and interactions.
    Search {
        text: String,
        #[arg(long, default_value_t = saleslog_core::search::DEFAULT_SEARCH_LIMIT)]
        limit: u32,
    },
    /// Export all interaction logs as CSV.
    ExportInteractions {
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the core version.
    Version,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, log_dir).context("initializing logging")?;
    }

    match cli.command {
        Command::Version => {
            println!("saleslog_core {}", core_version());
        }
        Command::Init => {
            open_db(&config.db_path)
                .with_context(|| format!("opening {}", config.db_path.display()))?;
            info!("event=cli_init module=cli status=ok");
            println!("initialized {}", config.db_path.display());
        }
        Command::Stats => {
            let conn = open_db(&config.db_path)
                .with_context(|| format!("opening {}", config.db_path.display()))?;
            let stats = dashboard_stats(&conn, Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Search { text, limit } => {
            let conn = open_db(&config.db_path)
                .with_context(|| format!("opening {}", config.db_path.display()))?;
            let results = search_all(&conn, &SearchQuery { text, limit })?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::ExportInteractions { out } => {
            let conn = open_db(&config.db_path)
                .with_context(|| format!("opening {}", config.db_path.display()))?;
            let rows = match out {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    export_interactions_csv(&conn, BufWriter::new(file))?
                }
                None => export_interactions_csv(&conn, io::stdout().lock())?,
            };
            eprintln!("exported {rows} interaction(s)");
        }
    }

    Ok(())
}
