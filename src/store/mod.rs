//! Relational boundary.
//!
//! The transform only ever needs three things from the store: the historical
//! station/fuel universe, a one-day price snapshot, and a batch append. Any
//! backend implementing `PriceStore` can stand in; `MemoryStore` serves tests
//! and database-free dry runs, `PgPriceStore` is the production backend.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{PriceRecord, StationFuelKey};
use crate::error::AppError;

pub mod postgres;

pub use postgres::PgPriceStore;

/// Read/append access to historical prices.
///
/// Every failure surfaces as `ErrorKind::BoundaryUnavailable` (or `PriceParse`
/// when a stored price cannot be decoded); callers abort rather than continue
/// with a partial universe.
pub trait PriceStore {
    /// All (station, address, fuel) triples ever loaded, deduplicated.
    fn fetch_known_station_fuel_keys(&mut self) -> Result<HashSet<StationFuelKey>, AppError>;

    /// Price per key stored for exactly `date`.
    fn fetch_prices_as_of(&mut self, date: NaiveDate) -> Result<BTreeMap<StationFuelKey, Decimal>, AppError>;

    /// Latest date on or before `date` that has any stored price.
    fn latest_price_date_on_or_before(&mut self, date: NaiveDate) -> Result<Option<NaiveDate>, AppError>;

    /// Append-only batch insert. Never deletes or overwrites.
    fn append_price_records(&mut self, records: &[PriceRecord]) -> Result<(), AppError>;

    /// Run an opaque post-load procedure. `name` is checked with `validate_procedure_name`.
    fn call_procedure(&mut self, name: &str) -> Result<(), AppError>;
}

/// Reject anything but a plain (optionally schema-qualified) SQL identifier.
pub fn validate_procedure_name(name: &str) -> Result<(), AppError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(AppError::config(format!("Invalid procedure name '{name}'.")))
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// In-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    history: BTreeMap<NaiveDate, BTreeMap<StationFuelKey, Decimal>>,
    appended: Vec<PriceRecord>,
    procedures: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a historical price for `key` on `date`.
    pub fn insert_history(&mut self, key: StationFuelKey, date: NaiveDate, price: Decimal) {
        self.history.entry(date).or_default().insert(key, price);
    }

    pub fn appended(&self) -> &[PriceRecord] {
        &self.appended
    }

    /// Procedures called so far, in order.
    pub fn procedures(&self) -> &[String] {
        &self.procedures
    }
}

impl PriceStore for MemoryStore {
    fn fetch_known_station_fuel_keys(&mut self) -> Result<HashSet<StationFuelKey>, AppError> {
        Ok(self
            .history
            .values()
            .flat_map(|day| day.keys().cloned())
            .chain(self.appended.iter().map(|r| r.key.clone()))
            .collect())
    }

    fn fetch_prices_as_of(&mut self, date: NaiveDate) -> Result<BTreeMap<StationFuelKey, Decimal>, AppError> {
        let mut prices = self.history.get(&date).cloned().unwrap_or_default();
        for record in self.appended.iter().filter(|r| r.date == date) {
            prices.insert(record.key.clone(), record.price);
        }
        Ok(prices)
    }

    fn latest_price_date_on_or_before(&mut self, date: NaiveDate) -> Result<Option<NaiveDate>, AppError> {
        let from_history = self.history.range(..=date).next_back().map(|(d, _)| *d);
        let from_appended = self.appended.iter().map(|r| r.date).filter(|d| *d <= date).max();
        Ok(from_history.max(from_appended))
    }

    fn append_price_records(&mut self, records: &[PriceRecord]) -> Result<(), AppError> {
        self.appended.extend_from_slice(records);
        Ok(())
    }

    fn call_procedure(&mut self, name: &str) -> Result<(), AppError> {
        validate_procedure_name(name)?;
        self.procedures.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn key(station: &str) -> StationFuelKey {
        StationFuelKey::new(station, "1 Main St", "E10").unwrap()
    }

    #[test]
    fn known_keys_are_deduplicated_across_days() {
        let mut store = MemoryStore::new();
        store.insert_history(key("A"), d(6, 30), dec!(1));
        store.insert_history(key("A"), d(7, 31), dec!(2));
        store.insert_history(key("B"), d(7, 31), dec!(3));

        let keys = store.fetch_known_station_fuel_keys().unwrap();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn snapshot_is_for_exact_date_only() {
        let mut store = MemoryStore::new();
        store.insert_history(key("A"), d(7, 30), dec!(1));
        store.insert_history(key("B"), d(7, 31), dec!(2));

        let snap = store.fetch_prices_as_of(d(7, 31)).unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.get(&key("B")), Some(&dec!(2)));
        assert!(store.fetch_prices_as_of(d(7, 29)).unwrap().is_empty());
    }

    #[test]
    fn latest_available_date_looks_backwards() {
        let mut store = MemoryStore::new();
        store.insert_history(key("A"), d(7, 28), dec!(1));
        store.insert_history(key("A"), d(8, 2), dec!(1));

        assert_eq!(store.latest_price_date_on_or_before(d(7, 31)).unwrap(), Some(d(7, 28)));
        assert_eq!(store.latest_price_date_on_or_before(d(7, 1)).unwrap(), None);
    }

    #[test]
    fn procedure_names_must_be_plain_identifiers() {
        assert!(validate_procedure_name("check_data_quality").is_ok());
        assert!(validate_procedure_name("public.check_data_quality").is_ok());
        for bad in ["x(); DROP TABLE y", "1abc", ""] {
            let err = validate_procedure_name(bad).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::Config, "{bad}");
        }
    }
}
