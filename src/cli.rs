//! CLI argument definitions.
//!
//! This module contains the top-level CLI structure and shared types.
//! Individual command definitions are in the `commands` module.

use clap::Parser;

use crate::commands::Command;
use crate::db::DatabaseConfig;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Database URL or path
    ///
    /// Accepts `postgres://...`, `sqlite://path`, a bare path or `:memory:`.
    /// If not specified, the database is resolved from:
    ///   1. .vtstore.json (project-local config file)
    ///   2. DATABASE_URL or VTSTORE_DB
    ///   3. ./vtstore.sqlite
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    /// Log debug events to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Resolve the database: an explicit `--db` wins over the config file and environment.
pub fn resolve_database(explicit: Option<&str>) -> Result<DatabaseConfig, Box<dyn std::error::Error>> {
    match explicit {
        Some(url) => Ok(DatabaseConfig::from_url(url)),
        None => DatabaseConfig::resolve(),
    }
}
