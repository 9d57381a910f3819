//! Daily aggregation: one median price per (key, date).
//!
//! The feed occasionally carries duplicate or erroneous same-day submissions;
//! the median absorbs a few of those without discarding genuine multi-update days.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{DailyMedianPrice, Observation, StationFuelKey};

/// Lookup of daily medians keyed by (key, date).
pub type DailyPrices = BTreeMap<(StationFuelKey, NaiveDate), Decimal>;

/// Group observations by (key, date) and take the median price of each group.
pub fn daily_medians(observations: &[Observation]) -> DailyPrices {
    let mut groups: BTreeMap<(StationFuelKey, NaiveDate), Vec<Decimal>> = BTreeMap::new();
    for obs in observations {
        groups
            .entry((obs.key.clone(), obs.date()))
            .or_default()
            .push(obs.price);
    }

    groups
        .into_iter()
        .filter_map(|(slot, mut prices)| median(&mut prices).map(|m| (slot, m)))
        .collect()
}

/// Flatten the lookup into rows (sorted by key, then date).
pub fn to_rows(prices: &DailyPrices) -> Vec<DailyMedianPrice> {
    prices
        .iter()
        .map(|((key, date), price)| DailyMedianPrice {
            key: key.clone(),
            date: *date,
            price: *price,
        })
        .collect()
}

/// Median of a non-empty slice; even counts average the two middle values.
pub fn median(values: &mut [Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / Decimal::TWO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn obs(station: &str, at: &str, price: Decimal) -> Observation {
        Observation {
            key: StationFuelKey::new(station, "1 Main St", "E10").unwrap(),
            price,
            observed_at: NaiveDateTime::parse_from_str(at, "%Y-%m-%d %H:%M").unwrap(),
        }
    }

    #[test]
    fn median_of_three_is_middle_value() {
        let rows = daily_medians(&[
            obs("K", "2025-08-03 06:00", dec!(3.20)),
            obs("K", "2025-08-03 09:30", dec!(3.00)),
            obs("K", "2025-08-03 18:45", dec!(3.10)),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.values().next(), Some(&dec!(3.10)));
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        let mut values = vec![dec!(190.9), dec!(185.9), dec!(187.9), dec!(300.0)];
        assert_eq!(median(&mut values), Some(dec!(189.4)));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn groups_by_key_and_calendar_date() {
        let prices = daily_medians(&[
            obs("A", "2025-08-03 06:00", dec!(1.0)),
            obs("A", "2025-08-04 06:00", dec!(2.0)),
            obs("B", "2025-08-03 23:59", dec!(3.0)),
        ]);
        let rows = to_rows(&prices);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].key.station(), "a");
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2025, 8, 4).unwrap());
        assert_eq!(rows[2].price, dec!(3.0));
    }
}
