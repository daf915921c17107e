//! # Affiliate Lookup CLI (`afl`)
//!
//! ## Usage
//!
//! ```bash
//! afl --config ./config/afl.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `afl init` | Create the SQLite database and run schema migrations |
//! | `afl inspect <file>` | Validate a spreadsheet and report its record count |
//! | `afl search <file> <doc>` | Exact lookup by document number |
//! | `afl find <file> [filters]` | Multi-field substring search |
//! | `afl history` | List recent searches |
//! | `afl export <file> <doc>` | Printable proof or JSON for one affiliate |
//! | `afl serve` | Start the search-history HTTP server |
//!
//! `inspect`, `search`, `find`, and `export` run without a config file;
//! history logging is then disabled.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use affiliate_lookup::affiliate_lookup_core::search::FuzzyQuery;
use affiliate_lookup::config::{load_config, load_or_minimal, Config};
use affiliate_lookup::db;
use affiliate_lookup::export::{self, ExportFormat, ProofDetails};
use affiliate_lookup::ingest;
use affiliate_lookup::logging::init_logging;
use affiliate_lookup::migrate;
use affiliate_lookup::search;
use affiliate_lookup::server;
use affiliate_lookup::sqlite_store::SqliteHistoryStore;

/// Affiliate Lookup: search an affiliate spreadsheet and audit every search.
#[derive(Parser)]
#[command(name = "afl", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/afl.toml")]
    config: PathBuf,

    /// Debug-level diagnostics on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the history database.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Decode and validate a spreadsheet without searching it.
    Inspect {
        /// `.xlsx`, `.csv`, or `.json` file.
        file: PathBuf,
    },

    /// Find one affiliate by exact document number.
    Search {
        file: PathBuf,
        /// Document number. Surrounding whitespace is ignored.
        document: String,
    },

    /// Find affiliates by case-insensitive substrings. All given filters must match.
    Find {
        file: PathBuf,

        /// Part of the document number.
        #[arg(long)]
        doc: Option<String>,

        /// Part of the given names (first and second).
        #[arg(long)]
        names: Option<String>,

        /// Part of the family names (first and second).
        #[arg(long)]
        surnames: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Show only the N-th match (1-based) in detail.
        #[arg(long, value_name = "N")]
        select: Option<usize>,
    },

    /// List recent searches, newest first.
    History {
        /// Defaults to `[history].default_limit`; capped at `max_limit`.
        #[arg(long)]
        limit: Option<String>,
    },

    /// Render one affiliate as a printable proof or as JSON.
    Export {
        file: PathBuf,
        document: String,

        #[arg(long, value_enum, default_value = "text")]
        format: ExportFormat,

        /// Output path, or `-` for stdout. Defaults to `afiliado-<DOC>.<ext>`.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Admission date (YYYY-MM-DD).
        #[arg(long, default_value = "")]
        admission: String,

        /// Discharge date (YYYY-MM-DD).
        #[arg(long, default_value = "")]
        discharge: String,

        #[arg(long, default_value = "")]
        diagnosis: String,
    },

    /// Start the search-history HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Init => {
            let cfg = load_config(&cli.config)?;
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Inspect { file } => {
            let cfg = load_or_minimal(&cli.config)?;
            ingest::run_inspect(&cfg, &file)?;
        }
        Commands::Search { file, document } => {
            let cfg = load_or_minimal(&cli.config)?;
            search::run_search(&cfg, &file, &document).await?;
        }
        Commands::Find {
            file,
            doc,
            names,
            surnames,
            phone,
            provider,
            category,
            select,
        } => {
            let cfg = load_or_minimal(&cli.config)?;
            let query = FuzzyQuery {
                document_id: doc,
                full_name_given: names,
                full_name_family: surnames,
                phone,
                provider,
                category,
            };
            search::run_find(&cfg, &file, query, select).await?;
        }
        Commands::History { limit } => {
            let cfg = load_config(&cli.config)?;
            run_history(&cfg, limit.as_deref()).await?;
        }
        Commands::Export {
            file,
            document,
            format,
            output,
            admission,
            discharge,
            diagnosis,
        } => {
            let cfg = load_or_minimal(&cli.config)?;
            let details = ProofDetails {
                admission,
                discharge,
                diagnosis,
            };
            export::run_export(
                &cfg,
                &file,
                &document,
                format,
                output.as_deref(),
                &details,
            )?;
        }
        Commands::Serve => {
            let cfg = load_config(&cli.config)?;
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_history(config: &Config, limit: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    let store = SqliteHistoryStore::new(pool);

    let entries = store.list(config.history.resolve_limit(limit)).await?;
    if entries.is_empty() {
        println!("No searches recorded.");
    }
    for entry in &entries {
        println!(
            "{}  {:<8}  found={:<5}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.search_type.as_str(),
            entry.result_found,
            entry.search_params
        );
    }

    store.pool().close().await;
    Ok(())
}
