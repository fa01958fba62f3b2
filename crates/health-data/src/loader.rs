//! Collection loader: every file of one category → one per-source table.

use std::path::{Path, PathBuf};

use health_core::models::{Column, DailyFrame, DailyTable};
use health_core::settings::DateWindow;
use tracing::{debug, info, warn};

use crate::reader::{find_matching_files, read_file};
use crate::sources::SourceCategory;

/// A file that was skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of loading one category.
#[derive(Debug, Clone)]
pub struct CollectionLoad {
    pub category: SourceCategory,
    /// Deduplicated, sorted, window-filtered rows.
    pub table: DailyTable,
    pub files_found: usize,
    pub failures: Vec<FileFailure>,
}

impl CollectionLoad {
    fn empty(category: SourceCategory, files_found: usize, failures: Vec<FileFailure>) -> Self {
        Self {
            category,
            table: DailyTable::new(),
            files_found,
            failures,
        }
    }
}

/// Load every file of `category` under `data_root`.
///
/// Files are parsed independently in path order; a file that fails is
/// recorded and skipped. The combined rows are deduplicated per day with the
/// last file winning, then restricted to `window`. No outcome here is an
/// error: a category without files or without usable rows yields an empty
/// table.
pub fn load_collection(
    data_root: &Path,
    category: SourceCategory,
    window: &DateWindow,
) -> CollectionLoad {
    let dir = data_root.join(category.folder());
    let files = find_matching_files(&dir, category.pattern());
    if files.is_empty() {
        debug!(
            "No files for {} ({}/{})",
            category,
            dir.display(),
            category.pattern()
        );
        return CollectionLoad::empty(category, 0, Vec::new());
    }

    info!("Loading {} files for {}", files.len(), category.pattern());

    let format = category.format();
    let mut combined = DailyFrame::new();
    let mut failures = Vec::new();

    for path in &files {
        match read_file(path).and_then(|content| format.parse(&content)) {
            Ok(Some(frame)) => {
                debug!("{}: {} rows", path.display(), frame.len());
                combined.extend(frame);
            }
            Ok(None) => debug!("{}: no usable records", path.display()),
            Err(e) => {
                warn!("Error {}: {}", path.display(), e);
                failures.push(FileFailure {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if combined.is_empty() {
        return CollectionLoad::empty(category, files.len(), failures);
    }

    // Days are naive calendar dates from the parsers on, so there is no
    // zone left to strip before deduplicating.
    if combined.has_duplicate_days() {
        debug!("{}: overlapping days across files, keeping the last", category);
    }
    let mut table = combined.keep_last();
    let stray = retain_category_columns(&mut table, category);
    if stray > 0 {
        warn!("{}: discarded {} values outside its columns", category, stray);
    }
    let dropped = apply_window(&mut table, window);
    if dropped > 0 {
        debug!("{}: {} days outside the date window", category, dropped);
    }

    CollectionLoad {
        category,
        table,
        files_found: files.len(),
        failures,
    }
}

/// Drop any value in a column `category` does not declare. Returns how many
/// values were removed.
pub fn retain_category_columns(table: &mut DailyTable, category: SourceCategory) -> usize {
    let allowed = category.columns();
    let mut removed = 0;
    for (_, record) in table.iter_mut() {
        let stray: Vec<Column> = record.columns().filter(|c| !allowed.contains(c)).collect();
        for column in stray {
            record.remove(column);
            removed += 1;
        }
    }
    removed
}

/// Keep only the days inside `window`. Returns how many days were removed.
pub fn apply_window(table: &mut DailyTable, window: &DateWindow) -> usize {
    let before = table.len();
    table.retain(|day, _| window.contains(day));
    before - table.len()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::starting(day(2024, 4, 1))
    }

    fn write(root: &Path, category: SourceCategory, name: &str, content: &str) {
        let dir = root.join(category.folder());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn rhr(date: &str, bpm: u32) -> String {
        format!(r#"[{{"value":{{"date":"{}","value":{}}}}}]"#, date, bpm)
    }

    #[test]
    fn test_no_files_yields_empty_table() {
        let root = TempDir::new().unwrap();
        let load = load_collection(root.path(), SourceCategory::Weight, &window());
        assert!(load.table.is_empty());
        assert_eq!(load.files_found, 0);
        assert!(load.failures.is_empty());
    }

    #[test]
    fn test_last_file_wins_on_duplicate_day() {
        let root = TempDir::new().unwrap();
        let cat = SourceCategory::RestingHeartRate;
        write(root.path(), cat, "resting_heart_rate-2024-04-01.json", &rhr("04/01/24", 60));
        write(root.path(), cat, "resting_heart_rate-2024-04-02.json", &rhr("04/01/24", 65));

        let load = load_collection(root.path(), cat, &window());

        assert_eq!(load.files_found, 2);
        assert_eq!(load.table.len(), 1);
        assert_eq!(load.table.value(day(2024, 4, 1), Column::RestingBpm), Some(65.0));
    }

    #[test]
    fn test_bad_file_is_recorded_and_skipped() {
        let root = TempDir::new().unwrap();
        let cat = SourceCategory::RestingHeartRate;
        write(root.path(), cat, "resting_heart_rate-a.json", "{not json");
        write(root.path(), cat, "resting_heart_rate-b.json", &rhr("04/03/24", 57));

        let load = load_collection(root.path(), cat, &window());

        assert_eq!(load.failures.len(), 1);
        assert!(load.failures[0].path.ends_with("resting_heart_rate-a.json"));
        assert_eq!(load.table.value(day(2024, 4, 3), Column::RestingBpm), Some(57.0));
    }

    #[test]
    fn test_all_files_failing_yields_empty_table() {
        let root = TempDir::new().unwrap();
        let cat = SourceCategory::HeartRateVariability;
        write(
            root.path(),
            cat,
            "Daily Heart Rate Variability Summary - 2024-04.csv",
            "timestamp,nremhr\n2024-04-01T00:00:00,55\n",
        );

        let load = load_collection(root.path(), cat, &window());
        assert!(load.table.is_empty());
        assert_eq!(load.files_found, 1);
        assert_eq!(load.failures.len(), 1);
    }

    #[test]
    fn test_rows_are_sorted_and_window_filtered() {
        let root = TempDir::new().unwrap();
        let cat = SourceCategory::RestingHeartRate;
        let content = r#"[
            {"value": {"date": "04/20/24", "value": 61}},
            {"value": {"date": "03/31/24", "value": 70}},
            {"value": {"date": "04/02/24", "value": 59}},
            {"value": {"date": "05/01/24", "value": 58}}
        ]"#;
        write(root.path(), cat, "resting_heart_rate-2024.json", content);

        let window = DateWindow::new(day(2024, 4, 1), Some(day(2024, 4, 30))).unwrap();
        let load = load_collection(root.path(), cat, &window);

        let days: Vec<NaiveDate> = load.table.days().collect();
        assert_eq!(days, vec![day(2024, 4, 2), day(2024, 4, 20)]);
    }

    #[test]
    fn test_retain_category_columns_drops_foreign_values() {
        let mut table = DailyTable::new();
        table.set(day(2024, 4, 1), Column::Spo2Avg, 96.0);
        table.set(day(2024, 4, 1), Column::Spo2Min, 93.0);
        table.set(day(2024, 4, 1), Column::RestingBpm, 60.0);

        let removed = retain_category_columns(&mut table, SourceCategory::Spo2);

        assert_eq!(removed, 1);
        assert_eq!(table.value(day(2024, 4, 1), Column::RestingBpm), None);
        assert_eq!(table.value(day(2024, 4, 1), Column::Spo2Avg), Some(96.0));
    }

    #[test]
    fn test_weight_load_stays_within_category_columns() {
        let root = TempDir::new().unwrap();
        let cat = SourceCategory::Weight;
        write(
            root.path(),
            cat,
            "weight-2024-04-01.json",
            r#"[{"date": "04/01/24", "weight": 176.4, "bmi": 24.4}]"#,
        );

        let load = load_collection(root.path(), cat, &window());
        let mut table = load.table.clone();
        assert_eq!(retain_category_columns(&mut table, cat), 0);
        assert_eq!(table, load.table);
    }

    #[test]
    fn test_apply_window_counts_removed_days() {
        let mut table = DailyTable::new();
        table.set(day(2024, 3, 30), Column::Weight, 80.0);
        table.set(day(2024, 4, 1), Column::Weight, 80.0);
        assert_eq!(apply_window(&mut table, &window()), 1);
        assert_eq!(apply_window(&mut table, &window()), 0);
    }
}
