//! Gap-fill reconciliation.
//!
//! Walks each station/fuel series once in ascending date order:
//!
//! - the walk starts from the key's carry-over price (may be absent)
//! - a day with a daily median takes that price and marks the day as a genuine update
//! - any other day keeps the running price (forward-fill) with no update date
//!
//! Cells reached before any price exists stay unpriced and are dropped by
//! `drop_unpriced`; nothing is ever filled from nothing.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::domain::{FilledCell, GridCell, ReconciledCell, StationFuelKey};
use crate::error::AppError;
use crate::transform::aggregate::DailyPrices;

/// Carry-over snapshot: one price per key as of the boundary date.
pub type CarryOver = BTreeMap<StationFuelKey, Decimal>;

/// Forward-fill the grid. `grid` must be sorted by (key, date).
pub fn reconcile(
    grid: &[GridCell],
    daily: &DailyPrices,
    carry_over: &CarryOver,
) -> Result<Vec<ReconciledCell>, AppError> {
    let mut out = Vec::with_capacity(grid.len());
    let mut current_key: Option<&StationFuelKey> = None;
    let mut price: Option<Decimal> = None;
    let mut prev: Option<&GridCell> = None;

    for cell in grid {
        if let Some(p) = prev {
            if cell <= p {
                return Err(AppError::malformed(format!(
                    "Grid is not in (key, date) order at {} on {}.",
                    cell.key, cell.date
                )));
            }
        }
        prev = Some(cell);

        if current_key != Some(&cell.key) {
            current_key = Some(&cell.key);
            price = carry_over.get(&cell.key).copied();
        }

        let observed = daily.get(&(cell.key.clone(), cell.date)).copied();
        let effective_update_date = match observed {
            Some(p) => {
                price = Some(p);
                Some(cell.date)
            }
            None => None,
        };

        out.push(ReconciledCell {
            key: cell.key.clone(),
            date: cell.date,
            price,
            effective_update_date,
        });
    }

    Ok(out)
}

/// Drop cells that never acquired a price.
pub fn drop_unpriced(cells: Vec<ReconciledCell>) -> Vec<FilledCell> {
    cells
        .into_iter()
        .filter_map(|c| {
            c.price.map(|price| FilledCell {
                key: c.key,
                date: c.date,
                price,
                effective_update_date: c.effective_update_date,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::transform::grid::expand;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, day).unwrap()
    }

    fn key(station: &str) -> StationFuelKey {
        StationFuelKey::new(station, "1 Main St", "E10").unwrap()
    }

    fn grid_for(keys: &[StationFuelKey], start: u32, end: u32) -> Vec<GridCell> {
        let keys: BTreeSet<_> = keys.iter().cloned().collect();
        expand(&keys, d(start), d(end)).unwrap()
    }

    #[test]
    fn forward_fills_between_observations() {
        let k = key("K");
        let mut daily = DailyPrices::new();
        daily.insert((k.clone(), d(1)), dec!(10));
        daily.insert((k.clone(), d(5)), dec!(12));

        let cells = reconcile(&grid_for(&[k], 1, 5), &daily, &CarryOver::new()).unwrap();
        let prices: Vec<_> = cells.iter().map(|c| c.price).collect();
        assert_eq!(
            prices,
            vec![Some(dec!(10)), Some(dec!(10)), Some(dec!(10)), Some(dec!(10)), Some(dec!(12))]
        );

        let updated: Vec<_> = cells.iter().filter_map(|c| c.effective_update_date).collect();
        assert_eq!(updated, vec![d(1), d(5)]);
    }

    #[test]
    fn carry_over_seeds_until_first_observation() {
        let k = key("K");
        let mut daily = DailyPrices::new();
        daily.insert((k.clone(), d(3)), dec!(10.1));
        let carry: CarryOver = [(k.clone(), dec!(9.5))].into();

        let cells = reconcile(&grid_for(&[k], 1, 4), &daily, &carry).unwrap();
        assert_eq!(cells[0].price, Some(dec!(9.5)));
        assert_eq!(cells[1].price, Some(dec!(9.5)));
        assert_eq!(cells[2].price, Some(dec!(10.1)));
        assert_eq!(cells[3].price, Some(dec!(10.1)));
        assert_eq!(cells[0].effective_update_date, None);
        assert_eq!(cells[2].effective_update_date, Some(d(3)));
    }

    #[test]
    fn carry_over_does_not_leak_across_keys() {
        let a = key("A");
        let b = key("B");
        let carry: CarryOver = [(a.clone(), dec!(2))].into();

        let cells = reconcile(&grid_for(&[a, b], 1, 2), &DailyPrices::new(), &carry).unwrap();
        assert_eq!(cells[1].price, Some(dec!(2)));
        assert_eq!(cells[2].price, None, "key B must restart without a price");
    }

    #[test]
    fn dangling_cells_are_dropped() {
        let k = key("K");
        let mut daily = DailyPrices::new();
        daily.insert((k.clone(), d(4)), dec!(7));

        let filled = drop_unpriced(reconcile(&grid_for(&[k], 1, 5), &daily, &CarryOver::new()).unwrap());
        let dates: Vec<_> = filled.iter().map(|c| c.date).collect();
        assert_eq!(dates, vec![d(4), d(5)]);
    }

    #[test]
    fn unsorted_grid_is_rejected() {
        let k = key("K");
        let mut grid = grid_for(&[k], 1, 3);
        grid.swap(0, 2);
        let err = reconcile(&grid, &DailyPrices::new(), &CarryOver::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedInput);
    }
}
