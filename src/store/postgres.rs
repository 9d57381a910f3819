//! PostgreSQL-backed `PriceStore`.
//!
//! The pipeline is synchronous, so each call drives `sqlx` on a private
//! current-thread runtime. All queries bind typed parameters.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::runtime::Runtime;
use tracing::warn;

use crate::domain::{PriceRecord, StationFuelKey};
use crate::error::AppError;
use crate::store::{validate_procedure_name, PriceStore};

/// Rows per batch inside the append transaction.
const APPEND_CHUNK: usize = 500;

const KNOWN_KEYS_SQL: &str = r#"
    SELECT DISTINCT s.name, s.address, p.fuelcode
    FROM public.fact_fuel_prices p
    INNER JOIN public.dim_fuel_stations s ON s.stationid = p.stationid
"#;

const PRICES_AS_OF_SQL: &str = r#"
    SELECT s.name, s.address, p.fuelcode, p.price
    FROM public.fact_fuel_prices p
    INNER JOIN public.dim_fuel_stations s ON s.stationid = p.stationid
    WHERE p.date = $1
    ORDER BY s.name, s.address, p.fuelcode, p.price
"#;

const LATEST_DATE_SQL: &str = r#"
    SELECT MAX(p.date)
    FROM public.fact_fuel_prices p
    WHERE p.date <= $1
"#;

const APPEND_SQL: &str = r#"
    INSERT INTO public.stg_fuel_price
        (record_id, servicestationname, address, fuelcode, date, price, priceupdateddate)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

pub struct PgPriceStore {
    runtime: Runtime,
    pool: PgPool,
}

impl PgPriceStore {
    /// Connect to `database_url`.
    pub fn connect(database_url: &str) -> Result<Self, AppError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AppError::boundary(format!("Failed to start database runtime: {e}")))?;

        let pool = runtime
            .block_on(PgPoolOptions::new().max_connections(1).connect(database_url))
            .map_err(|e| AppError::boundary(format!("Failed to connect to database: {e}")))?;

        Ok(Self { runtime, pool })
    }
}

impl PriceStore for PgPriceStore {
    fn fetch_known_station_fuel_keys(&mut self) -> Result<HashSet<StationFuelKey>, AppError> {
        let rows: Vec<(String, String, String)> = self
            .runtime
            .block_on(sqlx::query_as::<_, (String, String, String)>(KNOWN_KEYS_SQL).fetch_all(&self.pool))
            .map_err(|e| store_error("known station/fuel query", e))?;

        rows.iter()
            .map(|(name, address, fuel)| StationFuelKey::new(name, address, fuel))
            .collect()
    }

    fn fetch_prices_as_of(&mut self, date: NaiveDate) -> Result<BTreeMap<StationFuelKey, Decimal>, AppError> {
        let rows: Vec<(String, String, String, Decimal)> = self
            .runtime
            .block_on(sqlx::query_as::<_, (String, String, String, Decimal)>(PRICES_AS_OF_SQL).bind(date).fetch_all(&self.pool))
            .map_err(|e| store_error("carry-over price query", e))?;

        fold_snapshot(rows)
    }

    fn latest_price_date_on_or_before(&mut self, date: NaiveDate) -> Result<Option<NaiveDate>, AppError> {
        self.runtime
            .block_on(sqlx::query_scalar::<_, Option<NaiveDate>>(LATEST_DATE_SQL).bind(date).fetch_one(&self.pool))
            .map_err(|e| store_error("latest price date query", e))
    }

    fn append_price_records(&mut self, records: &[PriceRecord]) -> Result<(), AppError> {
        if records.is_empty() {
            return Ok(());
        }

        let pool = &self.pool;
        self.runtime
            .block_on(async move {
                let mut tx = pool.begin().await?;
                for chunk in records.chunks(APPEND_CHUNK) {
                    for r in chunk {
                        sqlx::query(APPEND_SQL)
                            .bind(&r.record_id)
                            .bind(r.key.station())
                            .bind(r.key.address())
                            .bind(r.key.fuel_code())
                            .bind(r.date)
                            .bind(r.price)
                            .bind(r.effective_update_date)
                            .execute(&mut *tx)
                            .await?;
                    }
                }
                tx.commit().await
            })
            .map_err(|e| store_error("price append", e))
    }

    fn call_procedure(&mut self, name: &str) -> Result<(), AppError> {
        validate_procedure_name(name)?;

        let sql = format!("CALL {name}()");
        self.runtime
            .block_on(sqlx::query(&sql).execute(&self.pool))
            .map_err(|e| store_error("procedure call", e))?;
        Ok(())
    }
}

/// Fold ordered snapshot rows into one price per normalized key.
///
/// Stored names that differ only by case or spacing collapse to one key; the
/// first row in query order wins.
fn fold_snapshot(
    rows: Vec<(String, String, String, Decimal)>,
) -> Result<BTreeMap<StationFuelKey, Decimal>, AppError> {
    let mut prices = BTreeMap::new();
    for (name, address, fuel, price) in rows {
        match prices.entry(StationFuelKey::new(&name, &address, &fuel)?) {
            Entry::Vacant(slot) => {
                slot.insert(price);
            }
            Entry::Occupied(kept) if *kept.get() != price => {
                warn!(key = %kept.key(), kept = %kept.get(), ignored = %price, "conflicting carry-over prices for one key");
            }
            Entry::Occupied(_) => {}
        }
    }
    Ok(prices)
}

fn store_error(stage: &str, err: sqlx::Error) -> AppError {
    match err {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            AppError::price_parse(format!("{stage}: stored value could not be decoded: {err}"))
        }
        other => AppError::boundary(format!("{stage} failed: {other}")),
    }
}
