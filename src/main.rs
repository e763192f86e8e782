//! # Edda CLI (`edda`)
//!
//! The `edda` binary drives scans of configured data sources and reads
//! the persisted catalog back.
//!
//! ## Usage
//!
//! ```bash
//! edda --config ./config/edda.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `edda init` | Create the SQLite metadata store and run schema migrations |
//! | `edda datasource list` | List configured data sources |
//! | `edda datasource test <name>` | Check connectivity to a data source |
//! | `edda scan <name>` | Extract, sample, profile, score and document a data source |
//! | `edda status <run>` | Show one scan run |
//! | `edda recent` | Show the most recent scan runs |
//! | `edda tables <run>` | List the tables captured by a run |
//! | `edda columns <table>` | List a table's columns |
//! | `edda relationships <table>` | List joins touching a table |
//! | `edda quality <table>` | Show quality score and column metrics |
//! | `edda docs <table>` | Print the generated table document |
//! | `edda export <table>` | Export a table document as markdown or JSON |
//! | `edda ask <run> "<question>"` | Answer a question from a run's artifacts |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the store
//! edda init --config ./config/edda.toml
//!
//! # Scan with a larger sample
//! edda scan shop --sample-size 2000
//!
//! # Export a document for the wiki
//! edda export 12 --format md --output docs/orders.md
//! ```

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use edda::progress::ProgressMode;
use edda::registry::ConnectorRegistry;
use edda::{
    ask_cmd, catalog_cmd, config, datasources, db, export, logging, scan_cmd,
};
use edda_core::catalog::{ExportFormat, RECENT_SCANS_LIMIT};
use edda_core::models::{ScanMode, ScanStatus};

/// Edda: scan relational data sources into a profiled, quality-scored
/// data dictionary.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/edda.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "edda",
    about = "Edda: scan relational data sources into a profiled data dictionary",
    version,
    long_about = "Edda extracts the schema of a relational database, samples and profiles \
    every table, scores data quality, generates per-table documentation and stores it all \
    per scan run in a local SQLite store."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/edda.toml`. Store, scan, logging and data
    /// source settings are read from this file.
    #[arg(long, global = true, default_value = "./config/edda.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the metadata store schema.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Manage configured data sources.
    Datasource {
        #[command(subcommand)]
        action: DatasourceAction,
    },

    /// Scan a configured data source.
    ///
    /// Extracts the catalog, samples each table, profiles the sample,
    /// scores quality and writes documentation. Exits non-zero when the
    /// run fails; the failed run stays queryable with `edda status`.
    Scan {
        /// Data source name (`[datasources.<name>]`).
        name: String,

        /// Scan mode recorded on the run: `quick` or `full`.
        #[arg(long)]
        mode: Option<ScanMode>,

        /// Rows sampled per table. Defaults to `scan.default_sample_size`.
        #[arg(long)]
        sample_size: Option<u32>,

        /// Progress output on stderr. Defaults to `human` on a TTY, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Show one scan run.
    Status {
        /// Scan run id.
        run: i64,
    },

    /// Show the most recent scan runs, newest first.
    Recent {
        #[arg(long, default_value_t = RECENT_SCANS_LIMIT)]
        limit: usize,
    },

    /// List the tables captured by a scan run.
    Tables {
        /// Scan run id.
        run: i64,
    },

    /// List a table's columns.
    Columns {
        /// Table id.
        table: i64,
    },

    /// List joins touching a table.
    Relationships {
        /// Table id.
        table: i64,
    },

    /// Show a table's quality score, reasons and column metrics.
    Quality {
        /// Table id.
        table: i64,
    },

    /// Print a table's generated document.
    Docs {
        /// Table id.
        table: i64,

        /// Print the structured document and metadata as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Export a table's document.
    Export {
        /// Table id.
        table: i64,

        /// `md` or `json`.
        #[arg(long, default_value = "md")]
        format: ExportFormat,

        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Answer a question from a scan run's persisted artifacts.
    Ask {
        /// Scan run id.
        run: i64,

        /// The question, e.g. "how do I join orders to payments?".
        question: String,

        /// Omit the SQL suggestion from join answers.
        #[arg(long)]
        no_sql: bool,

        /// Print the answer as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Data source subcommands.
#[derive(Subcommand)]
enum DatasourceAction {
    /// List configured data sources and their registered ids.
    List,
    /// Check connectivity to a data source.
    Test {
        /// Data source name.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging);

    run(cli.command, &cfg).await
}

async fn run(command: Commands, cfg: &config::Config) -> anyhow::Result<()> {
    // Opening the store creates the database and applies migrations.
    let store = db::open_store(cfg).await?;

    match command {
        Commands::Init => {
            println!("Metadata store initialized at {}", cfg.db.path.display());
        }
        Commands::Datasource { action } => match action {
            DatasourceAction::List => {
                datasources::list_datasources(&store, cfg).await?;
            }
            DatasourceAction::Test { name } => {
                let registry = ConnectorRegistry::with_builtins();
                if !datasources::test_datasource(&store, cfg, &registry, &name).await? {
                    bail!("connection test failed for '{}'", name);
                }
            }
        },
        Commands::Scan {
            name,
            mode,
            sample_size,
            progress,
        } => {
            let registry = ConnectorRegistry::with_builtins();
            let progress = progress.unwrap_or_else(ProgressMode::default_for_tty);
            let summary =
                scan_cmd::run_scan(&store, cfg, &registry, &name, mode, sample_size, progress)
                    .await?;
            scan_cmd::print_summary(&summary);
            if summary.status != ScanStatus::Completed {
                bail!("scan run {} failed", summary.scan_run_id);
            }
        }
        Commands::Status { run } => catalog_cmd::status(&store, run).await?,
        Commands::Recent { limit } => catalog_cmd::recent(&store, limit).await?,
        Commands::Tables { run } => catalog_cmd::tables(&store, run).await?,
        Commands::Columns { table } => catalog_cmd::columns(&store, table).await?,
        Commands::Relationships { table } => catalog_cmd::relationships(&store, table).await?,
        Commands::Quality { table } => catalog_cmd::quality(&store, table).await?,
        Commands::Docs { table, json } => catalog_cmd::docs(&store, table, json).await?,
        Commands::Export {
            table,
            format,
            output,
        } => {
            export::run_export(&store, table, format, output.as_deref()).await?;
        }
        Commands::Ask {
            run,
            question,
            no_sql,
            json,
        } => {
            ask_cmd::run_ask(&store, run, &question, !no_sql, json).await?;
        }
    }

    Ok(())
}
