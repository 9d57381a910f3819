//! Output assembly: trim to the target month and fingerprint each row.

use crate::domain::{FilledCell, PriceRecord, RunContext};
use crate::error::AppError;
use crate::transform::fingerprint::record_id;

/// Keep only target-month cells and turn them into load-ready records.
///
/// The seed day (and anything else outside the target month) is scaffolding
/// for the forward-fill and is never emitted.
pub fn assemble(cells: &[FilledCell], ctx: &RunContext) -> Result<Vec<PriceRecord>, AppError> {
    cells
        .iter()
        .filter(|c| ctx.in_target_month(c.date))
        .map(|c| {
            Ok(PriceRecord {
                record_id: record_id(&c.key, c.price, c.date)?,
                key: c.key.clone(),
                date: c.date,
                price: c.price,
                effective_update_date: c.effective_update_date,
            })
        })
        .collect()
}
