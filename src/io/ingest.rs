//! CSV ingest and normalization.
//!
//! This module turns the monthly price file into a clean set of `Observation`s.
//! It is the only place that knows the source column names.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Fail fast** on bad rows: a non-numeric price means the feed changed shape
//! - **Deterministic behavior** (no hidden defaults)

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use rust_decimal::Decimal;

use crate::domain::{Observation, StationFuelKey};
use crate::error::AppError;

const COL_STATION: &str = "servicestationname";
const COL_ADDRESS: &str = "address";
const COL_FUEL: &str = "fuelcode";
const COL_UPDATED: &str = "priceupdateddate";
const COL_PRICE: &str = "price";

const REQUIRED: [&str; 5] = [COL_STATION, COL_ADDRESS, COL_FUEL, COL_UPDATED, COL_PRICE];

/// Columns whose blank cells take the previous row's value.
///
/// Spreadsheet exports of the feed merge repeated cells vertically, prices included.
const INHERITED: [&str; 5] = [COL_STATION, COL_ADDRESS, COL_FUEL, COL_UPDATED, COL_PRICE];

/// Ingest output: observations plus a few counters for the run summary.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub observations: Vec<Observation>,
    pub rows_read: usize,
    /// Cells filled from the row above.
    pub cells_inherited: usize,
}

/// Load and normalize the monthly CSV at `path`.
pub fn load_observations(path: &Path) -> Result<IngestedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_observations(file)
}

/// Parse observations from any CSV reader.
pub fn read_observations<R: Read>(source: R) -> Result<IngestedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::malformed(format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut observations = Vec::new();
    let mut previous: HashMap<&str, String> = HashMap::new();
    let mut rows_read = 0usize;
    let mut cells_inherited = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header, and lines are 1-based.
        let line = idx + 2;

        let record = result.map_err(|e| AppError::malformed(format!("CSV parse error on line {line}: {e}")))?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        rows_read += 1;

        let mut fields: HashMap<&str, String> = HashMap::new();
        for column in INHERITED {
            let value = match get_optional(&record, &header_map, column) {
                Some(v) => v.to_string(),
                None => {
                    let inherited = previous.get(column).cloned().ok_or_else(|| {
                        AppError::malformed(format!("Line {line}: missing `{column}` with no previous row to inherit from."))
                    })?;
                    cells_inherited += 1;
                    inherited
                }
            };
            fields.insert(column, value);
        }

        let key = StationFuelKey::new(&fields[COL_STATION], &fields[COL_ADDRESS], &fields[COL_FUEL])
            .map_err(|e| AppError::malformed(format!("Line {line}: {}", e.message())))?;
        let observed_at = parse_timestamp(&fields[COL_UPDATED])
            .map_err(|msg| AppError::malformed(format!("Line {line}: {msg}")))?;
        let price = parse_price(&fields[COL_PRICE])
            .map_err(|msg| AppError::price_parse(format!("Line {line}: {msg}")))?;

        observations.push(Observation {
            key,
            price,
            observed_at,
        });
        previous = fields;
    }

    Ok(IngestedData {
        observations,
        rows_read,
        cells_inherited,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM on the first header, otherwise the schema check misses it.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    let missing: Vec<&str> = REQUIRED
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::malformed(format!(
            "Missing required column(s): {}",
            missing.iter().map(|c| format!("`{c}`")).collect::<Vec<_>>().join(", ")
        )))
    }
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a submission timestamp.
///
/// The portal has published ISO timestamps and day-first local forms (with and
/// without AM/PM) in different months, so a small fixed set is accepted.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    const DATETIME_FMTS: [&str; 7] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %I:%M:%S %p",
        "%d/%m/%Y %I:%M %p",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];
    const DATE_FMTS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d.and_time(chrono::NaiveTime::MIN));
        }
    }
    Err(format!(
        "Invalid timestamp '{s}'. Expected YYYY-MM-DD[ HH:MM[:SS]] or DD/MM/YYYY[ HH:MM[:SS][ AM|PM]]."
    ))
}

fn parse_price(s: &str) -> Result<Decimal, String> {
    s.parse::<Decimal>()
        .map_err(|_| format!("Price '{s}' is not numeric."))
}
