//! Derived daily metrics computed on the merged table: readiness, BMR,
//! active calories and intensity index.

use tracing::{debug, warn};

use crate::models::{Column, DailyTable};
use crate::settings::BodyProfile;

/// Weight used for every day when the table has no weight column at all.
pub const FALLBACK_WEIGHT_KG: f64 = 75.0;

/// Standard deviations at or below this are treated as zero spread.
const MIN_STD_DEV: f64 = 1e-9;

const ACTIVE_MINUTE_COLUMNS: [Column; 3] = [
    Column::LightlyActiveMinutes,
    Column::ModeratelyActiveMinutes,
    Column::VeryActiveMinutes,
];

// ── Statistics ────────────────────────────────────────────────────────────────

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator), `None` below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Mean and spread of one column, or `None` when a z-score is undefined.
fn z_params(table: &DailyTable, column: Column) -> Option<(f64, f64)> {
    let values = table.series(column);
    let m = mean(&values)?;
    let sd = sample_std_dev(&values)?;
    if sd <= MIN_STD_DEV {
        return None;
    }
    Some((m, sd))
}

/// Mifflin–St Jeor basal metabolic rate in kcal/day.
pub fn mifflin_st_jeor(weight_kg: f64, body: &BodyProfile) -> f64 {
    10.0 * weight_kg + 6.25 * body.height_cm - 5.0 * f64::from(body.age) + body.sex.bmr_term()
}

// ── MetricsEngine ─────────────────────────────────────────────────────────────

/// Stateless collection of the derived-metric transforms.
pub struct MetricsEngine;

impl MetricsEngine {
    /// Run both metric groups over `table`. Returns whether readiness could
    /// be computed; the metabolic group always runs.
    pub fn apply(table: &mut DailyTable, body: &BodyProfile) -> bool {
        let readiness = Self::calculate_readiness(table);
        Self::calculate_metabolic_metrics(table, body);
        readiness
    }

    /// Add `readiness_raw = z(overall_score) - z(resting_bpm)`.
    ///
    /// Skipped for the whole table (returns `false`) when either input column
    /// is entirely absent. A series with zero spread leaves every day missing.
    pub fn calculate_readiness(table: &mut DailyTable) -> bool {
        if !table.has_column(Column::OverallScore) || !table.has_column(Column::RestingBpm) {
            warn!("Missing sleep score or resting heart rate columns; readiness skipped");
            return false;
        }

        let sleep = z_params(table, Column::OverallScore);
        let rhr = z_params(table, Column::RestingBpm);
        if sleep.is_none() || rhr.is_none() {
            debug!("Readiness input has no spread; readiness is undefined for every day");
        }

        for (_, record) in table.iter_mut() {
            let sleep_z = sleep
                .zip(record.get(Column::OverallScore))
                .map(|((m, sd), v)| (v - m) / sd);
            let rhr_z = rhr
                .zip(record.get(Column::RestingBpm))
                .map(|((m, sd), v)| (v - m) / sd);
            match (sleep_z, rhr_z) {
                (Some(s), Some(h)) => record.set(Column::ReadinessRaw, s - h),
                _ => {
                    record.remove(Column::ReadinessRaw);
                }
            }
        }
        true
    }

    /// Add `weight_filled`, `bmr`, `active_calories`, `total_active_minutes`
    /// and `intensity_index`.
    pub fn calculate_metabolic_metrics(table: &mut DailyTable, body: &BodyProfile) {
        Self::fill_weight(table);

        for column in ACTIVE_MINUTE_COLUMNS {
            table.fill_zero(column);
        }

        for (_, record) in table.iter_mut() {
            let weight = record
                .get(Column::WeightFilled)
                .unwrap_or(FALLBACK_WEIGHT_KG);
            let bmr = mifflin_st_jeor(weight, body);
            record.set(Column::Bmr, bmr);

            let active_calories = record
                .get(Column::CaloriesTotal)
                .map(|total| (total - bmr).max(0.0));
            match active_calories {
                Some(v) => record.set(Column::ActiveCalories, v),
                None => {
                    record.remove(Column::ActiveCalories);
                }
            }

            let total_active: f64 = ACTIVE_MINUTE_COLUMNS
                .iter()
                .map(|c| record.get(*c).unwrap_or(0.0))
                .sum();
            record.set(Column::TotalActiveMinutes, total_active);

            if total_active > 0.0 {
                match active_calories {
                    Some(v) => record.set(Column::IntensityIndex, v / total_active),
                    None => {
                        record.remove(Column::IntensityIndex);
                    }
                }
            } else {
                record.set(Column::IntensityIndex, 0.0);
            }
        }
    }

    /// Forward-fill then back-fill the weight into `weight_filled`; the
    /// fallback constant stands in when no day has a weight.
    fn fill_weight(table: &mut DailyTable) {
        let first_known = table.series(Column::Weight).first().copied();
        let Some(first_known) = first_known else {
            for (_, record) in table.iter_mut() {
                record.set(Column::WeightFilled, FALLBACK_WEIGHT_KG);
            }
            return;
        };

        let mut carried = first_known;
        for (_, record) in table.iter_mut() {
            if let Some(w) = record.get(Column::Weight) {
                carried = w;
            }
            record.set(Column::WeightFilled, carried);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
