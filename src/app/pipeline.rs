//! Shared transform pipeline.
//!
//! observations -> daily medians -> key universe -> grid -> carry-over
//! -> forward-fill -> month trim + fingerprints -> (optional) append
//!
//! Nothing is appended unless every stage before it succeeded.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::{CarryOverSource, Observation, PriceRecord, RunContext};
use crate::error::AppError;
use crate::store::PriceStore;
use crate::transform::{self, CarryOver};

/// Counters for the run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub observations: usize,
    pub daily_prices: usize,
    pub observed_keys: usize,
    pub historical_keys: usize,
    pub universe_keys: usize,
    pub grid_cells: usize,
    pub carry_over_prices: usize,
    pub dropped_unpriced: usize,
    pub emitted: usize,
    pub genuine_updates: usize,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub context: RunContext,
    /// Date the carry-over snapshot was read for (`None`: no stored date qualified).
    pub carry_over_date: Option<NaiveDate>,
    pub records: Vec<PriceRecord>,
    pub stats: RunStats,
    pub appended: bool,
}

/// Run the full transform against `store` and append the result unless `dry_run`.
pub fn run_transform<S: PriceStore + ?Sized>(
    observations: &[Observation],
    carry_over_source: CarryOverSource,
    store: &mut S,
    dry_run: bool,
) -> Result<RunOutput, AppError> {
    let mut output = build_records(observations, carry_over_source, store)?;

    if dry_run {
        info!(rows = output.records.len(), "dry run: skipping append");
    } else {
        append_records(store, &mut output)?;
    }

    Ok(output)
}

/// The single write: append `output.records` and mark the output as appended.
pub fn append_records<S: PriceStore + ?Sized>(store: &mut S, output: &mut RunOutput) -> Result<(), AppError> {
    store.append_price_records(&output.records)?;
    output.appended = true;
    info!(rows = output.records.len(), "appended price records");
    Ok(())
}

/// Every read and the whole transform; no writes.
pub fn build_records<S: PriceStore + ?Sized>(
    observations: &[Observation],
    carry_over_source: CarryOverSource,
    store: &mut S,
) -> Result<RunOutput, AppError> {
    let ctx = RunContext::from_dates(observations.iter().map(Observation::date), carry_over_source)?;
    info!(
        window_start = %ctx.window_start,
        window_end = %ctx.window_end,
        target = %ctx.target_label(),
        "resolved run window"
    );

    let daily = transform::daily_medians(observations);
    let observed: BTreeSet<_> = daily.keys().map(|(key, _)| key.clone()).collect();

    let historical = store.fetch_known_station_fuel_keys()?;
    let universe = transform::key_universe(&observed, &historical);
    info!(
        observed = observed.len(),
        historical = historical.len(),
        universe = universe.len(),
        "built station/fuel universe"
    );

    let grid = transform::expand(&universe, ctx.window_start, ctx.window_end)?;

    let carry_over_date = resolve_carry_over_date(&ctx, store)?;
    let carry_over: CarryOver = match carry_over_date {
        Some(date) => store.fetch_prices_as_of(date)?,
        None => CarryOver::new(),
    };
    info!(
        date = ?carry_over_date,
        prices = carry_over.len(),
        source = ctx.carry_over_source.display_name(),
        "loaded carry-over snapshot"
    );

    let reconciled = transform::reconcile(&grid, &daily, &carry_over)?;
    let reconciled_len = reconciled.len();
    let filled = transform::drop_unpriced(reconciled);
    let dropped = reconciled_len - filled.len();
    if dropped > 0 {
        warn!(cells = dropped, "dropped cells with no price history yet");
    }

    let records = transform::assemble(&filled, &ctx)?;
    let genuine_updates = records.iter().filter(|r| r.effective_update_date.is_some()).count();
    info!(rows = records.len(), genuine_updates, "assembled output rows");

    let stats = RunStats {
        observations: observations.len(),
        daily_prices: daily.len(),
        observed_keys: observed.len(),
        historical_keys: historical.len(),
        universe_keys: universe.len(),
        grid_cells: grid.len(),
        carry_over_prices: carry_over.len(),
        dropped_unpriced: dropped,
        emitted: records.len(),
        genuine_updates,
    };

    Ok(RunOutput {
        context: ctx,
        carry_over_date,
        records,
        stats,
        appended: false,
    })
}

fn resolve_carry_over_date<S: PriceStore + ?Sized>(
    ctx: &RunContext,
    store: &mut S,
) -> Result<Option<NaiveDate>, AppError> {
    match ctx.carry_over_source {
        CarryOverSource::LastCalendarDay => Ok(Some(ctx.carry_over_date)),
        CarryOverSource::LastAvailable => store.latest_price_date_on_or_before(ctx.carry_over_date),
    }
}
