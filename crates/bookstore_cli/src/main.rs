//! Bookstore demo entry point.
//!
//! # Responsibility
//! - Parse flags, initialize logging and open the selected backend.
//! - Run the scripted sequence once and release the connection on every
//!   outcome.

use anyhow::{Context, Result};
use bookstore_core::config::{DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_MONGODB_URI};
use bookstore_core::db::{connect_mongo, open_db, open_db_in_memory};
use bookstore_core::{
    default_log_level, init_logging, run_demo_session, sample_books, BookstoreConfig,
    DemoConnection, DemoResult, DemoScript,
};
use clap::{Parser, ValueEnum};
use log::error;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    /// MongoDB server reachable at `--uri`.
    Mongo,
    /// Embedded SQLite database.
    Sqlite,
}

#[derive(Debug, Parser)]
#[command(
    name = "bookstore",
    version,
    about = "Runs the bookstore CRUD, aggregation and indexing demo"
)]
struct Cli {
    #[arg(long, value_enum, env = "BOOKSTORE_BACKEND", default_value_t = Backend::Mongo)]
    backend: Backend,

    #[arg(long, env = "BOOKSTORE_MONGODB_URI", default_value = DEFAULT_MONGODB_URI)]
    uri: String,

    #[arg(long, env = "BOOKSTORE_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    #[arg(long, env = "BOOKSTORE_COLLECTION", default_value = DEFAULT_COLLECTION)]
    collection: String,

    /// SQLite file for the embedded backend; in-memory when omitted.
    #[arg(long, env = "BOOKSTORE_SQLITE_PATH")]
    sqlite_path: Option<PathBuf>,

    /// Insert the sample catalogue before running the demo.
    #[arg(long)]
    seed: bool,

    /// trace|debug|info|warn|error; defaults by build mode.
    #[arg(long, env = "BOOKSTORE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rotating log files; stderr only when omitted.
    #[arg(long, env = "BOOKSTORE_LOG_DIR")]
    log_dir: Option<String>,
}

impl Cli {
    fn config(&self) -> BookstoreConfig {
        BookstoreConfig {
            mongodb_uri: self.uri.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    if let Err(err) = init_logging(level, cli.log_dir.as_deref()) {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    let outcome = match cli.backend {
        Backend::Mongo => run_mongo(&cli.config(), cli.seed),
        Backend::Sqlite => run_sqlite(cli.sqlite_path.as_deref(), cli.seed),
    };

    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        // Already reported by the session before the connection closed.
        Ok(Err(_)) => ExitCode::FAILURE,
        Err(err) => {
            error!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Outer error: the connection never opened. Inner: the session outcome.
fn run_mongo(config: &BookstoreConfig, seed: bool) -> Result<DemoResult<()>> {
    let connection = connect_mongo(config)
        .with_context(|| format!("failed to connect to {}", config.mongodb_uri))?;
    Ok(run_session(connection, seed))
}

fn run_sqlite(path: Option<&Path>, seed: bool) -> Result<DemoResult<()>> {
    let conn = match path {
        Some(path) => open_db(path)
            .with_context(|| format!("failed to open {}", path.display()))?,
        None => open_db_in_memory().context("failed to open in-memory database")?,
    };
    Ok(run_session(conn, seed))
}

fn run_session<C: DemoConnection>(connection: C, seed: bool) -> DemoResult<()> {
    let catalogue = seed.then(sample_books);
    let stdout = io::stdout();
    run_demo_session(
        connection,
        DemoScript::default(),
        catalogue.as_deref(),
        &mut stdout.lock(),
    )
}
