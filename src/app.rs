//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - honors the run-state skip guard
//! - ingests the monthly file
//! - runs the transform against the store and writes the optional export
//! - appends, updates the state file, and calls the post-load procedure
//! - prints the summary

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, StatusArgs, TransformArgs};
use crate::domain::{Observation, RunConfig};
use crate::error::AppError;
use crate::io::RunState;
use crate::store::{validate_procedure_name, MemoryStore, PgPriceStore, PriceStore};

pub mod pipeline;

/// Exit code for a run skipped because its month was already transformed.
pub const SKIPPED_EXIT_CODE: u8 = 10;

/// How a successful invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Ran and produced output.
    Produced,
    /// Preconditions not met; nothing was read or written.
    Skipped,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Produced => 0,
            RunStatus::Skipped => SKIPPED_EXIT_CODE,
        }
    }
}

/// Entry point for the `fuelseries` binary.
pub fn run() -> Result<RunStatus, AppError> {
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Command::Transform(args) => handle_transform(run_config_from_args(&args)),
        Command::Status(args) => handle_status(args),
    }
}

fn handle_transform(config: RunConfig) -> Result<RunStatus, AppError> {
    let mut state = match &config.state_path {
        Some(path) => Some(crate::io::read_state_json(path)?),
        None => None,
    };
    if let Some(state) = &state {
        if state.already_transformed() {
            info!(file = %state.latest_file, "file has already been transformed; skipping");
            return Ok(RunStatus::Skipped);
        }
    }

    info!(input = %config.input.display(), "reading monthly file");
    let ingest = crate::io::load_observations(&config.input)?;
    info!(
        rows = ingest.rows_read,
        inherited_cells = ingest.cells_inherited,
        "ingested observations"
    );

    let mut store: Box<dyn PriceStore> = match resolve_database_url(&config) {
        Some(url) => Box::new(PgPriceStore::connect(&url)?),
        None if config.dry_run => {
            warn!("no database configured: dry run without historical keys or carry-over");
            Box::new(MemoryStore::new())
        }
        None => {
            return Err(AppError::config(
                "No database configured: pass --database-url or set DATABASE_URL (.env).",
            ));
        }
    };

    let run = execute_transform(&config, &ingest.observations, store.as_mut(), state.as_mut())?;

    println!("{}", crate::report::format_run_summary(&run));
    info!("operation complete");
    Ok(RunStatus::Produced)
}

/// Transform, export, then write.
///
/// Everything that can fail without touching the store runs before the append,
/// so a failed run leaves the store and the state file as they were.
fn execute_transform<S: PriceStore + ?Sized>(
    config: &RunConfig,
    observations: &[Observation],
    store: &mut S,
    state: Option<&mut RunState>,
) -> Result<pipeline::RunOutput, AppError> {
    if let Some(procedure) = &config.quality_procedure {
        validate_procedure_name(procedure)?;
    }

    let mut run = pipeline::build_records(observations, config.carry_over, store)?;

    if let Some(path) = &config.export {
        crate::io::write_records_csv(path, &run.records)?;
        info!(path = %path.display(), rows = run.records.len(), "exported records");
    }

    if config.dry_run {
        info!(rows = run.records.len(), "dry run: skipping append");
        return Ok(run);
    }

    pipeline::append_records(store, &mut run)?;

    if let (Some(path), Some(state)) = (&config.state_path, state) {
        state.mark_transformed();
        crate::io::write_state_json(path, state)?;
        info!(file = %state.latest_file, "state file updated");
    }

    if let Some(procedure) = &config.quality_procedure {
        info!(procedure = %procedure, "running data-quality procedure");
        store.call_procedure(procedure)?;
    }

    Ok(run)
}

fn handle_status(args: StatusArgs) -> Result<RunStatus, AppError> {
    let state = crate::io::read_state_json(&args.state)?;
    println!("{}", crate::report::format_state(&state));
    Ok(RunStatus::Produced)
}

pub fn run_config_from_args(args: &TransformArgs) -> RunConfig {
    RunConfig {
        input: args.input.clone(),
        state_path: args.state.clone(),
        carry_over: args.carry_over,
        dry_run: args.dry_run,
        export: args.export.clone(),
        database_url: args.database_url.clone(),
        quality_procedure: args.quality_procedure.clone(),
    }
}

fn resolve_database_url(config: &RunConfig) -> Option<String> {
    if let Some(url) = &config.database_url {
        return Some(url.clone());
    }
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty())
}

fn init_logging(log_file: Option<&Path>) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| AppError::config(format!("Failed to open log file '{}': {e}", path.display())))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    result.map_err(|e| AppError::config(format!("Failed to initialize logging: {e}")))
}

/// Rewrite argv so `fuelseries` defaults to `fuelseries transform`.
///
/// Rules:
/// - `fuelseries -i aug.csv ...`          -> `fuelseries transform -i aug.csv ...`
/// - argv naming a subcommand after any global flags -> unchanged
/// - `fuelseries`, `--help/--version/-h`  -> unchanged (show top-level help/version)
///
/// Only the first token after the global flags is inspected, so a flag value
/// such as `--state status` is never mistaken for a subcommand.
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let mut idx = 1;
    while let Some(arg) = argv.get(idx) {
        match arg.as_str() {
            "--log-file" => idx += 2,
            a if a.starts_with("--log-file=") => idx += 1,
            _ => break,
        }
    }

    let Some(first) = argv.get(idx) else {
        return argv;
    };

    let leaves_as_is = matches!(
        first.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help" | "transform" | "status"
    );
    if leaves_as_is {
        return argv;
    }

    // Bare flags are treated as "transform flags".
    if first.starts_with('-') {
        argv.insert(1, "transform".to_string());
    }
    argv
}
