//! Command-line parsing for the monthly fuel-price transform.
//!
//! Argument parsing and command dispatch stay separate from the transform code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::CarryOverSource;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "fuelseries",
    version,
    about = "Monthly fuel-price reconciliation into a gap-free daily series"
)]
pub struct Cli {
    /// Append log lines to this file instead of stderr.
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile one monthly file and append the daily series to the store.
    Transform(TransformArgs),
    /// Show the run-state file and whether the next transform would be skipped.
    Status(StatusArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct TransformArgs {
    /// Monthly source CSV.
    #[arg(short = 'i', long, value_name = "CSV")]
    pub input: PathBuf,

    /// Run-state JSON; the run is skipped when its month was already transformed.
    #[arg(long, value_name = "JSON")]
    pub state: Option<PathBuf>,

    /// Which stored date seeds the forward-fill at the month boundary.
    #[arg(long, value_enum, default_value_t = CarryOverSource::LastCalendarDay)]
    pub carry_over: CarryOverSource,

    /// Read and transform, but append nothing and leave the state file untouched.
    #[arg(long)]
    pub dry_run: bool,

    /// Also write the load-ready rows to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// PostgreSQL connection string (falls back to `DATABASE_URL`, `.env` supported).
    #[arg(long, value_name = "URL")]
    pub database_url: Option<String>,

    /// Stored procedure to CALL after a successful append (e.g. a data-quality check).
    #[arg(long, value_name = "NAME")]
    pub quality_procedure: Option<String>,
}

#[derive(Debug, Parser, Clone)]
pub struct StatusArgs {
    /// Run-state JSON.
    #[arg(long, value_name = "JSON")]
    pub state: PathBuf,
}
