//! Deterministic content fingerprints for output rows.
//!
//! `record_id` is a pure function of (station, address, fuel code, price, date):
//! the same logical observation hashes to the same id on every run, so the
//! store can ignore re-appended rows by id.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::domain::StationFuelKey;
use crate::error::AppError;

/// Decimal places used for the canonical price text.
pub const PRICE_SCALE: u32 = 4;

/// Field separator in the canonical row text.
const SEPARATOR: &str = "|";

/// Fixed-scale price text, e.g. `189.9` -> `189.9000`.
pub fn canonical_price(price: Decimal) -> String {
    let mut p = price.round_dp(PRICE_SCALE);
    p.rescale(PRICE_SCALE);
    p.to_string()
}

/// The canonical row text that is hashed.
pub fn canonical_row(key: &StationFuelKey, price: Decimal, date: NaiveDate) -> String {
    [
        key.station(),
        key.address(),
        key.fuel_code(),
        &canonical_price(price),
        &date.format("%Y-%m-%d").to_string(),
    ]
    .join(SEPARATOR)
}

/// 128-bit fingerprint (truncated SHA-256) rendered as 32 lowercase hex chars.
pub fn record_id(key: &StationFuelKey, price: Decimal, date: NaiveDate) -> Result<String, AppError> {
    if !key.is_complete() {
        return Err(AppError::malformed(format!(
            "Cannot fingerprint a row with a blank key field ({key}) on {date}."
        )));
    }

    let digest = Sha256::digest(canonical_row(key, price, date).as_bytes());
    Ok(hex::encode(&digest[..16]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn key() -> StationFuelKey {
        StationFuelKey::new("Metro Petroleum", "1 Main St, Sydney", "E10").unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 3).unwrap()
    }

    #[test]
    fn canonical_row_uses_fixed_scale_and_iso_date() {
        let row = canonical_row(&key(), dec!(189.9), date());
        assert_eq!(row, "metro petroleum|1 main st, sydney|e10|189.9000|2025-08-03");
    }

    #[test]
    fn id_is_stable_and_128_bit_hex() {
        let a = record_id(&key(), dec!(189.9), date()).unwrap();
        let b = record_id(&key(), dec!(189.90), date()).unwrap();
        assert_eq!(a, b, "trailing zeros must not change the fingerprint");
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn id_changes_with_any_field() {
        let base = record_id(&key(), dec!(189.9), date()).unwrap();
        let other_price = record_id(&key(), dec!(190.9), date()).unwrap();
        let other_date = record_id(&key(), dec!(189.9), date().succ_opt().unwrap()).unwrap();
        let other_fuel = record_id(
            &StationFuelKey::new("Metro Petroleum", "1 Main St, Sydney", "U91").unwrap(),
            dec!(189.9),
            date(),
        )
        .unwrap();

        assert_ne!(base, other_price);
        assert_ne!(base, other_date);
        assert_ne!(base, other_fuel);
    }
}
