//! Main analysis pipeline.
//!
//! Runs the merge orchestrator, then the metrics engine, returning a
//! [`HealthAnalysis`] ready for the exporters.

use chrono::Utc;
use health_core::error::Result;
use health_core::metrics::MetricsEngine;
use health_core::models::DailyTable;
use health_core::settings::HealthConfig;

use crate::merge::{merge_all, CategorySummary};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    /// Number of days in the final table.
    pub days: usize,
    /// Categories that contributed at least one day.
    pub categories_with_data: usize,
    /// Files that could not be parsed, across all categories.
    pub files_failed: usize,
    /// Days dropped by the calorie sentinel.
    pub empty_days_removed: usize,
    /// Whether the readiness score could be computed.
    pub readiness_computed: bool,
    /// Wall-clock seconds spent loading and merging.
    pub load_time_seconds: f64,
}

impl AnalysisMetadata {
    /// One-line run summary for the log.
    pub fn summary_line(&self) -> String {
        format!(
            "{} days from {} categories in {:.2}s ({} files failed, {} empty days removed, readiness {}) at {}",
            self.days,
            self.categories_with_data,
            self.load_time_seconds,
            self.files_failed,
            self.empty_days_removed,
            if self.readiness_computed { "computed" } else { "skipped" },
            self.generated_at
        )
    }
}

/// The complete output of [`analyze_health`].
#[derive(Debug, Clone)]
pub struct HealthAnalysis {
    pub table: DailyTable,
    pub categories: Vec<CategorySummary>,
    pub metadata: AnalysisMetadata,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full pipeline.
///
/// 1. Load and merge every category under `config.data_root`.
/// 2. Compute readiness and metabolic metrics on the merged table.
///
/// `Ok(None)` means no category had any data in the window.
pub fn analyze_health(config: &HealthConfig) -> Result<Option<HealthAnalysis>> {
    // ── Step 1: Load & merge ──────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let Some(merged) = merge_all(&config.data_root, &config.window)? else {
        return Ok(None);
    };
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Metrics ───────────────────────────────────────────────────────
    let mut table = merged.table;
    let readiness = MetricsEngine::apply(&mut table, &config.body);

    // ── Step 3: Build result ──────────────────────────────────────────────────
    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        days: table.len(),
        categories_with_data: merged.categories.iter().filter(|c| c.days > 0).count(),
        files_failed: merged.categories.iter().map(|c| c.files_failed).sum(),
        empty_days_removed: merged.empty_days_removed,
        readiness_computed: readiness,
        load_time_seconds: load_time,
    };

    Ok(Some(HealthAnalysis {
        table,
        categories: merged.categories,
        metadata,
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
