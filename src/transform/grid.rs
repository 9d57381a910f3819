//! Grid expansion.
//!
//! Builds the full cartesian product of station/fuel keys and calendar days.
//! The forward-fill walk depends on (key, date) ascending order, so the order
//! is established here explicitly instead of trusting input order.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::domain::{GridCell, StationFuelKey};
use crate::error::AppError;

/// Every calendar day in `[start, end]` inclusive.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>, AppError> {
    if end < start {
        return Err(AppError::malformed(format!(
            "Invalid grid window: start={start}, end={end} (end must not precede start)."
        )));
    }
    Ok(start.iter_days().take_while(|d| *d <= end).collect())
}

/// Union of this month's observed keys and the historically known keys.
pub fn key_universe<'a, O, H>(observed: O, historical: H) -> BTreeSet<StationFuelKey>
where
    O: IntoIterator<Item = &'a StationFuelKey>,
    H: IntoIterator<Item = &'a StationFuelKey>,
{
    observed.into_iter().chain(historical).cloned().collect()
}

/// Cross join keys with the window, sorted by (key, date).
pub fn expand(
    keys: &BTreeSet<StationFuelKey>,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<GridCell>, AppError> {
    let dates = date_range(start, end)?;

    let mut cells = Vec::with_capacity(keys.len() * dates.len());
    for key in keys {
        for date in &dates {
            cells.push(GridCell {
                key: key.clone(),
                date: *date,
            });
        }
    }

    cells.sort();
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, day).unwrap()
    }

    fn key(station: &str, fuel: &str) -> StationFuelKey {
        StationFuelKey::new(station, "1 Main St", fuel).unwrap()
    }

    #[test]
    fn date_range_is_inclusive() {
        let days = date_range(d(1), d(4)).unwrap();
        assert_eq!(days, vec![d(1), d(2), d(3), d(4)]);
        assert!(date_range(d(4), d(1)).is_err());
    }

    #[test]
    fn universe_deduplicates_observed_and_historical() {
        let observed = [key("A", "E10"), key("B", "U91")];
        let historical = [key("b", "u91"), key("C", "P98")];
        let keys = key_universe(&observed, &historical);
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn grid_has_exactly_one_cell_per_key_and_day() {
        let keys: BTreeSet<_> = [key("B", "U91"), key("A", "E10"), key("A", "P98")].into();
        let grid = expand(&keys, d(1), d(5)).unwrap();

        assert_eq!(grid.len(), 3 * 5);
        let unique: HashSet<_> = grid.iter().collect();
        assert_eq!(unique.len(), grid.len());

        for k in &keys {
            for day in 1..=5 {
                assert!(unique.contains(&GridCell { key: k.clone(), date: d(day) }));
            }
        }
    }

    #[test]
    fn grid_is_sorted_by_key_then_date() {
        let keys: BTreeSet<_> = [key("B", "U91"), key("A", "E10")].into();
        let grid = expand(&keys, d(30).pred_opt().unwrap(), d(30)).unwrap();
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(grid[0].key.station(), "a");
        assert_eq!(grid[0].date, d(29));
    }
}
