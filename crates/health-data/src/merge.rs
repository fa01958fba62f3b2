//! Merge orchestrator: loads every category and outer-joins them into the
//! single Daily Record Table.

use std::path::Path;

use health_core::error::{HealthError, Result};
use health_core::models::{Column, DailyTable};
use health_core::settings::DateWindow;
use tracing::{debug, info};

use crate::loader::{apply_window, load_collection, CollectionLoad};
use crate::sources::SourceCategory;

// ── Public types ──────────────────────────────────────────────────────────────

/// Per-category figures gathered while merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySummary {
    pub category: SourceCategory,
    pub files_found: usize,
    pub files_failed: usize,
    pub days: usize,
}

/// The merged table plus what it took to build it.
#[derive(Debug, Clone)]
pub struct MergeResult {
    pub table: DailyTable,
    pub categories: Vec<CategorySummary>,
    /// Days removed because they had no positive calorie total.
    pub empty_days_removed: usize,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Build the master table from every known category.
///
/// Returns `Ok(None)` when no category produced any data; the only error is
/// a data root that is missing or not a directory.
pub fn merge_all(data_root: &Path, window: &DateWindow) -> Result<Option<MergeResult>> {
    if !data_root.is_dir() {
        return Err(HealthError::DataPathNotFound(data_root.to_path_buf()));
    }

    info!(
        "Building master dataset from {} ({} onwards)",
        data_root.display(),
        window.start
    );

    let loads: Vec<CollectionLoad> = SourceCategory::ALL
        .iter()
        .map(|category| load_collection(data_root, *category, window))
        .collect();

    let categories = loads
        .iter()
        .map(|load| CategorySummary {
            category: load.category,
            files_found: load.files_found,
            files_failed: load.failures.len(),
            days: load.table.len(),
        })
        .collect();

    let tables: Vec<DailyTable> = loads
        .into_iter()
        .map(|load| load.table)
        .filter(|table| !table.is_empty())
        .collect();

    let Some((table, empty_days_removed)) = merge_tables(tables, window) else {
        info!("No data found for any category");
        return Ok(None);
    };

    if let (Some(first), Some(last)) = (table.first_day(), table.last_day()) {
        info!("Master dataset: {} days ({} to {})", table.len(), first, last);
    }

    Ok(Some(MergeResult {
        table,
        categories,
        empty_days_removed,
    }))
}

/// Outer-join already-loaded per-source tables and clean up the result.
///
/// Empty inputs are ignored; `None` means nothing was left to merge. The
/// second value is the number of days dropped by the calorie sentinel.
pub fn merge_tables(
    tables: impl IntoIterator<Item = DailyTable>,
    window: &DateWindow,
) -> Option<(DailyTable, usize)> {
    let mut tables = tables.into_iter().filter(|t| !t.is_empty());

    // Seed with the first non-empty table, then join the rest. Each table is
    // keyed by day, so one row per day holds at every step.
    let mut master = tables.next()?;
    for table in tables {
        master.outer_join(table);
    }

    let outside = apply_window(&mut master, window);
    if outside > 0 {
        debug!("{} merged days outside the date window", outside);
    }

    let filled = master.fill_zero_columns();
    if !filled.is_empty() {
        debug!(
            "Zero-filled {}",
            filled
                .iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    let removed = drop_days_without_calories(&mut master);
    if removed > 0 {
        info!("Cleaned {} empty rows", removed);
    }

    Some((master, removed))
}

/// Remove every day whose calorie total is not strictly positive.
///
/// A positive total is the proxy for "the tracker was worn that day". The
/// rule is only applied when the table carries calories at all.
pub fn drop_days_without_calories(table: &mut DailyTable) -> usize {
    if !table.has_column(Column::CaloriesTotal) {
        return 0;
    }
    let before = table.len();
    table.retain(|_, record| {
        record
            .get(Column::CaloriesTotal)
            .map_or(false, |calories| calories > 0.0)
    });
    before - table.len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
