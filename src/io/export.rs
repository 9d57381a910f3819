//! Export load-ready price records to CSV.
//!
//! Same columns as the staging table, so the file can be bulk-loaded or diffed
//! against a previous run.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::PriceRecord;
use crate::error::AppError;
use crate::transform::canonical_price;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    record_id: &'a str,
    servicestationname: &'a str,
    address: &'a str,
    fuelcode: &'a str,
    date: NaiveDate,
    price: String,
    priceupdateddate: Option<NaiveDate>,
}

impl<'a> From<&'a PriceRecord> for ExportRow<'a> {
    fn from(r: &'a PriceRecord) -> Self {
        Self {
            record_id: &r.record_id,
            servicestationname: r.key.station(),
            address: r.key.address(),
            fuelcode: r.key.fuel_code(),
            date: r.date,
            price: canonical_price(r.price),
            priceupdateddate: r.effective_update_date,
        }
    }
}

/// Write records to a CSV file at `path`.
pub fn write_records_csv(path: &Path, records: &[PriceRecord]) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::config(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_records(file, records)
}

/// Write records to any writer, header first.
pub fn write_records<W: Write>(sink: W, records: &[PriceRecord]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(sink);
    for r in records {
        writer
            .serialize(ExportRow::from(r))
            .map_err(|e| AppError::config(format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::config(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::domain::StationFuelKey;

    #[test]
    fn writes_header_and_blank_for_filled_days() {
        let key = StationFuelKey::new("Metro", "1 Main St", "E10").unwrap();
        let records = vec![
            PriceRecord {
                record_id: "a".repeat(32),
                key: key.clone(),
                date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                price: dec!(189.9),
                effective_update_date: NaiveDate::from_ymd_opt(2025, 8, 1),
            },
            PriceRecord {
                record_id: "b".repeat(32),
                key,
                date: NaiveDate::from_ymd_opt(2025, 8, 2).unwrap(),
                price: dec!(189.9),
                effective_update_date: None,
            },
        ];

        let mut out = Vec::new();
        write_records(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines[0],
            "record_id,servicestationname,address,fuelcode,date,price,priceupdateddate"
        );
        assert!(lines[1].ends_with(",metro,1 main st,e10,2025-08-01,189.9000,2025-08-01"));
        assert!(lines[2].ends_with(",2025-08-02,189.9000,"));
    }
}
