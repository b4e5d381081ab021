//! Interactive run-parameter prompts.
//!
//! Everything here can be bypassed with CLI flags; prompts only run for
//! parameters the command line left unspecified.

use anyhow::Result;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use rostermark_core::{ColumnSet, ResultColumn};

/// Default worker count: one per CPU minus one for the collector, at
/// least two, capped by the configured ceiling.
#[must_use]
pub fn recommended_workers(max_workers: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4);
    cpus.saturating_sub(1).clamp(2, max_workers.max(2))
}

/// Ask whether to fill all result columns or a selected subset.
///
/// An empty subset selection falls back to all columns.
pub fn choose_columns() -> Result<ColumnSet> {
    let mode = Select::new()
        .with_prompt("Fill all columns or selected columns?")
        .items(&["all", "selected"])
        .default(0)
        .interact()?;
    if mode == 0 {
        tracing::info!("Column mode: all");
        return Ok(ColumnSet::all());
    }

    let labels: Vec<&str> = ResultColumn::ALL.iter().map(ResultColumn::header).collect();
    let picked = MultiSelect::new()
        .with_prompt("Columns to fill")
        .items(&labels)
        .interact()?;
    if picked.is_empty() {
        tracing::info!("No columns selected, falling back to all");
        return Ok(ColumnSet::all());
    }

    let columns: Vec<ResultColumn> = picked.into_iter().map(|i| ResultColumn::ALL[i]).collect();
    tracing::info!(
        "Column mode: selected -> {:?}",
        columns.iter().map(ResultColumn::header).collect::<Vec<_>>()
    );
    Ok(ColumnSet::selected(columns))
}

/// Ask for the 1-based row to start from.
pub fn ask_start_row() -> Result<usize> {
    let row: usize = Input::new()
        .with_prompt("Start from which row number? (1 = first)")
        .default(1)
        .interact_text()?;
    Ok(row.max(1))
}

/// Ask for the worker count, bounded by the job count.
pub fn ask_worker_count(recommended: usize, total_jobs: usize) -> Result<usize> {
    let upper = total_jobs.max(1);
    let workers: usize = Input::new()
        .with_prompt(format!("How many workers? [1-{upper}]"))
        .default(recommended.clamp(1, upper))
        .interact_text()?;
    Ok(workers.clamp(1, upper))
}

/// Ask whether to run the slow backfill checker after the main pass.
pub fn ask_enable_backfill() -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt("Enable slow backfill checker?")
        .default(false)
        .interact()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommended_workers_bounds() {
        let workers = recommended_workers(6);
        assert!(workers >= 2);
        assert!(workers <= 6);

        // A ceiling below the floor still yields a sane count.
        assert_eq!(recommended_workers(1), 2);
    }
}
