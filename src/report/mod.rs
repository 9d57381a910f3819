//! Terminal run summary.
//!
//! Formatting lives here so the pipeline code only produces numbers.

use crate::app::pipeline::RunOutput;
use crate::io::state::RunState;

/// Format the summary printed after a transform.
pub fn format_run_summary(run: &RunOutput) -> String {
    let ctx = &run.context;
    let s = &run.stats;
    let mut out = String::new();

    out.push_str("=== fuelseries - monthly price reconciliation ===\n");
    out.push_str(&format!("Target month: {}\n", ctx.target_label()));
    out.push_str(&format!(
        "Window: {} .. {} ({} days incl. seed day)\n",
        ctx.window_start,
        ctx.window_end,
        ctx.window_days(),
    ));
    out.push_str(&format!(
        "Carry-over: {} -> {} ({} prices)\n",
        ctx.carry_over_source.display_name(),
        run.carry_over_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "none".to_string()),
        s.carry_over_prices,
    ));
    out.push_str(&format!(
        "Observations: {} -> {} daily medians\n",
        s.observations, s.daily_prices
    ));
    out.push_str(&format!(
        "Keys: observed={} | historical={} | universe={}\n",
        s.observed_keys, s.historical_keys, s.universe_keys
    ));
    out.push_str(&format!(
        "Grid: {} cells | dropped (no price yet): {}\n",
        s.grid_cells, s.dropped_unpriced
    ));
    out.push_str(&format!(
        "Output: {} rows | genuine updates: {} | forward-filled: {}\n",
        s.emitted,
        s.genuine_updates,
        s.emitted - s.genuine_updates,
    ));
    out.push_str(if run.appended {
        "Store: appended\n"
    } else {
        "Store: not written (dry run)\n"
    });

    out
}

/// Format the run-state file for `fuelseries status`.
pub fn format_state(state: &RunState) -> String {
    let mut out = String::new();
    out.push_str(&format!("Latest file: {}\n", state.latest_file));
    out.push_str(&format!(
        "Last transformation: {}\n",
        state.last_transformation.as_deref().unwrap_or("never")
    ));
    out.push_str(if state.already_transformed() {
        "Next transform: skipped (already transformed)\n"
    } else {
        "Next transform: pending\n"
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::app::pipeline::RunStats;
    use crate::domain::{CarryOverSource, RunContext};

    #[test]
    fn summary_reports_counts_and_dry_run() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 8, day).unwrap();
        let run = RunOutput {
            context: RunContext::from_span(d(1), d(31), CarryOverSource::LastCalendarDay).unwrap(),
            carry_over_date: NaiveDate::from_ymd_opt(2025, 7, 31),
            records: Vec::new(),
            stats: RunStats {
                emitted: 62,
                genuine_updates: 20,
                grid_cells: 64,
                ..RunStats::default()
            },
            appended: false,
        };

        let text = format_run_summary(&run);
        assert!(text.contains("Target month: aug2025"));
        assert!(text.contains("Window: 2025-07-31 .. 2025-08-31 (32 days"));
        assert!(text.contains("Output: 62 rows | genuine updates: 20 | forward-filled: 42"));
        assert!(text.contains("dry run"));
    }

    #[test]
    fn status_reports_pending_month() {
        let state: RunState =
            serde_json::from_str(r#"{"latest_file": "sep2025", "last_transformation": "aug2025"}"#).unwrap();
        let text = format_state(&state);
        assert!(text.contains("Last transformation: aug2025"));
        assert!(text.contains("pending"));
    }
}
