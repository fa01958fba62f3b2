//! Result export and console preview.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use health_core::models::{Column, DailyTable, DAY_FORMAT};

use crate::bootstrap::ensure_output_dir;

/// Records file written to the output directory.
pub const JSON_FILE: &str = "health_data.json";
/// Tabular file written to the output directory.
pub const CSV_FILE: &str = "health_analysis.csv";

/// Columns shown in the post-run preview, when present.
pub const PREVIEW_COLUMNS: [Column; 4] = [
    Column::RestingBpm,
    Column::ReadinessRaw,
    Column::Bmr,
    Column::ActiveCalories,
];

/// Paths of the files produced by [`export_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub json: PathBuf,
    pub csv: PathBuf,
}

// ── Export ─────────────────────────────────────────────────────────────────────

/// Write the table as JSON records and as CSV into `output_dir`.
pub fn export_table(table: &DailyTable, output_dir: &Path) -> anyhow::Result<ExportPaths> {
    ensure_output_dir(output_dir)?;

    let json = output_dir.join(JSON_FILE);
    let file = File::create(&json).with_context(|| format!("cannot create {}", json.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &table.to_json_records())?;
    writer.flush()?;

    let csv = output_dir.join(CSV_FILE);
    let file = File::create(&csv).with_context(|| format!("cannot create {}", csv.display()))?;
    table.write_csv(BufWriter::new(file))?;

    Ok(ExportPaths { json, csv })
}

// ── Preview ────────────────────────────────────────────────────────────────────

/// Render the first `rows` days of the preview columns the table carries.
///
/// The first line is the header; an empty vector means there is nothing to
/// show.
pub fn preview_lines(table: &DailyTable, rows: usize) -> Vec<String> {
    let columns: Vec<Column> = PREVIEW_COLUMNS
        .into_iter()
        .filter(|c| table.has_column(*c))
        .collect();
    if columns.is_empty() || table.is_empty() {
        return Vec::new();
    }

    let width = |c: &Column| c.name().len().max(8);

    let mut header = format!("{:<10}", "date");
    for column in &columns {
        header.push_str(&format!("  {:>w$}", column.name(), w = width(column)));
    }

    let mut lines = vec![header];
    for (day, record) in table.iter().take(rows) {
        let mut line = day.format(DAY_FORMAT).to_string();
        for column in &columns {
            let cell = record
                .get(*column)
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string());
            line.push_str(&format!("  {:>w$}", cell, w = width(column)));
        }
        lines.push(line);
    }
    lines
}

// ── Tests ──────────────────────────────────────────────────────────────────────
