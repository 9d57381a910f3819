//! Shared domain types.
//!
//! One schema for every stage: ingest produces `Observation`s, the transform
//! stages pass `StationFuelKey`-keyed cells between them, and the store and
//! exporter both consume `PriceRecord`s. Column-name matching happens once,
//! in `io::ingest`, and nowhere else.

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Composite identity of one station selling one fuel type.
///
/// Fields are normalized on construction (trimmed, inner whitespace collapsed,
/// lower-cased), so the same physical pair always yields an equal key whether
/// it came from the monthly file or from the store. The derived ordering
/// (station, address, fuel code) is the series order used by the grid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StationFuelKey {
    station: String,
    address: String,
    fuel_code: String,
}

impl StationFuelKey {
    pub fn new(station: &str, address: &str, fuel_code: &str) -> Result<Self, AppError> {
        let station = normalize_text(station);
        let address = normalize_text(address);
        let fuel_code = normalize_text(fuel_code);

        for (name, value) in [
            ("station name", &station),
            ("address", &address),
            ("fuel code", &fuel_code),
        ] {
            if value.is_empty() {
                return Err(AppError::malformed(format!(
                    "Blank {name} in station/fuel key ({station:?}, {address:?}, {fuel_code:?})."
                )));
            }
        }

        Ok(Self {
            station,
            address,
            fuel_code,
        })
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn fuel_code(&self) -> &str {
        &self.fuel_code
    }

    /// True when no field is blank. Always holds for keys built through `new`.
    pub fn is_complete(&self) -> bool {
        !(self.station.is_empty() || self.address.is_empty() || self.fuel_code.is_empty())
    }
}

impl fmt::Display for StationFuelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.station, self.address, self.fuel_code)
    }
}

/// Canonical text form for key fields.
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One raw price submission from the monthly file.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub key: StationFuelKey,
    pub price: Decimal,
    pub observed_at: NaiveDateTime,
}

impl Observation {
    /// Calendar date of the submission (time component discarded).
    pub fn date(&self) -> NaiveDate {
        self.observed_at.date()
    }
}

/// Median of all submissions for one key on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyMedianPrice {
    pub key: StationFuelKey,
    pub date: NaiveDate,
    pub price: Decimal,
}

/// One (key, date) slot of the expanded grid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridCell {
    pub key: StationFuelKey,
    pub date: NaiveDate,
}

/// A grid cell after the forward-fill walk.
///
/// `price` is `None` only while no carry-over and no observation has been
/// reached for the key yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledCell {
    pub key: StationFuelKey,
    pub date: NaiveDate,
    pub price: Option<Decimal>,
    pub effective_update_date: Option<NaiveDate>,
}

/// A reconciled cell that carries a price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledCell {
    pub key: StationFuelKey,
    pub date: NaiveDate,
    pub price: Decimal,
    /// Set only when the price was genuinely observed on `date`.
    pub effective_update_date: Option<NaiveDate>,
}

/// One load-ready output row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    /// Content fingerprint of (key, price, date); natural key for idempotent loads.
    pub record_id: String,
    pub key: StationFuelKey,
    pub date: NaiveDate,
    pub price: Decimal,
    pub effective_update_date: Option<NaiveDate>,
}

/// Which stored date seeds the forward-fill at the month boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CarryOverSource {
    /// Exactly the last calendar day of the previous month.
    #[default]
    LastCalendarDay,
    /// The latest stored price date on or before that calendar day.
    LastAvailable,
}

impl CarryOverSource {
    pub fn display_name(self) -> &'static str {
        match self {
            CarryOverSource::LastCalendarDay => "last calendar day",
            CarryOverSource::LastAvailable => "last available date",
        }
    }
}

/// A full run's configuration as understood by the app layer.
///
/// Derived from CLI flags plus environment.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    pub state_path: Option<PathBuf>,
    pub carry_over: CarryOverSource,
    pub dry_run: bool,
    pub export: Option<PathBuf>,
    pub database_url: Option<String>,
    pub quality_procedure: Option<String>,
}
