//! End-to-end runs of the merge and metrics stages over a fake export tree.

use std::path::Path;

use chrono::NaiveDate;
use health_core::error::HealthError;
use health_core::metrics::MetricsEngine;
use health_core::models::{Column, DailyTable};
use health_core::settings::{BodyProfile, DateWindow, Sex};
use health_data::loader::apply_window;
use health_data::merge::merge_all;
use tempfile::TempDir;

const GLOBAL: &str = "Global Export Data";

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
}

fn window() -> DateWindow {
    DateWindow::starting(day(1))
}

fn body() -> BodyProfile {
    BodyProfile {
        height_cm: 180.0,
        age: 38,
        sex: Sex::Male,
    }
}

fn write(root: &Path, folder: &str, name: &str, content: &str) {
    let dir = root.join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), content).unwrap();
}

fn approx(actual: Option<f64>, expected: f64) {
    let actual = actual.unwrap_or_else(|| panic!("expected {}, got missing", expected));
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// A small export covering every category.
///
/// Days 2024-04-01..03 are worn days, 04-04 has a zero calorie total and
/// 03-31 lies before the window.
fn full_export(root: &Path) {
    write(
        root,
        GLOBAL,
        "calories-2024-04-01.json",
        r#"[
            {"dateTime": "03/31/24 12:00:00", "value": "1800"},
            {"dateTime": "04/01/24 00:00:00", "value": "1000"},
            {"dateTime": "04/01/24 00:01:00", "value": "1500"},
            {"dateTime": "04/02/24 00:00:00", "value": "0.01"},
            {"dateTime": "04/03/24 00:00:00", "value": "2000"},
            {"dateTime": "04/04/24 00:00:00", "value": "0"}
        ]"#,
    );
    write(
        root,
        GLOBAL,
        "resting_heart_rate-2024-04-01.json",
        r#"[
            {"value": {"date": "04/01/24", "value": 60}},
            {"value": {"date": "04/03/24", "value": 58}}
        ]"#,
    );
    write(
        root,
        GLOBAL,
        "resting_heart_rate-2024-04-02.json",
        r#"[{"value": {"date": "04/01/24", "value": 65}}]"#,
    );
    write(
        root,
        GLOBAL,
        "weight-2024-04-01.json",
        r#"[{"date": "04/01/24", "weight": 200.0, "bmi": 27.1}]"#,
    );
    write(
        root,
        GLOBAL,
        "sleep-2024-04-01.json",
        r#"[{"dateOfSleep": "2024-04-01", "levels": {"summary": {
            "deep": {"minutes": 60}, "light": {"minutes": 200},
            "rem": {"minutes": 90}, "wake": {"minutes": 40}}}}]"#,
    );
    write(
        root,
        GLOBAL,
        "very_active_minutes-2024-04-01.json",
        r#"[{"dateTime": "04/01/24 00:00:00", "value": "30"}]"#,
    );
    write(
        root,
        GLOBAL,
        "moderately_active_minutes-2024-04-01.json",
        r#"[{"dateTime": "04/01/24 00:00:00", "value": "20"}]"#,
    );
    write(
        root,
        GLOBAL,
        "sedentary_minutes-2024-04-01.json",
        r#"[{"dateTime": "04/01/24 00:00:00", "value": "600"}]"#,
    );
    write(
        root,
        "Sleep Score",
        "sleep_score.csv",
        "sleep_log_entry_id,timestamp,overall_score,deep_sleep_in_minutes,restlessness\n\
         1,2024-04-01T07:00:00Z,80,60,0.05\n\
         2,2024-04-02T06:00:00Z,75,55,0.06\n\
         3,2024-04-02T23:30:00-05:00,70,50,0.07\n",
    );
    write(
        root,
        "Oxygen Saturation (SpO2)",
        "Daily SpO2 - 2024-04-01-2024-04-30.csv",
        "timestamp,average_value,lower_bound,upper_bound\n\
         2024-04-01T00:00:00,96.5,94.0,99.0\n",
    );
    write(
        root,
        "Heart Rate Variability",
        "Daily Heart Rate Variability Summary - 2024-04.csv",
        "timestamp,rmssd,nremhr,entropy\n\
         2024-04-01T00:00:00,42.5,55.1,2.9\n\
         2024-04-03T00:00:00,38.0,56.0,3.0\n",
    );
    write(
        root,
        "Stress Score",
        "Stress Score.csv",
        "DATE,UPDATED_AT,STRESS_SCORE\n\
         2024-04-01T00:00:00,2024-04-02T01:00:00,78\n\
         2024-04-02T00:00:00,2024-04-03T01:00:00,0\n",
    );
}

fn run(root: &Path) -> DailyTable {
    let merged = merge_all(root, &window()).unwrap().expect("data present");
    let mut table = merged.table;
    MetricsEngine::apply(&mut table, &body());
    table
}

// ── Merge properties ──────────────────────────────────────────────────────────

#[test]
fn test_full_export_days_are_unique_sorted_and_windowed() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let table = run(root.path());

    let days: Vec<NaiveDate> = table.days().collect();
    assert_eq!(days, vec![day(1), day(2), day(3)]);
}

#[test]
fn test_calorie_sentinel_boundary() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let merged = merge_all(root.path(), &window()).unwrap().unwrap();

    // 0.01 survives, 0 does not.
    approx(merged.table.value(day(2), Column::CaloriesTotal), 0.01);
    assert!(merged.table.get(day(4)).is_none());
    assert_eq!(merged.empty_days_removed, 1);
}

#[test]
fn test_every_category_contributes() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let merged = merge_all(root.path(), &window()).unwrap().unwrap();
    let table = &merged.table;

    approx(table.value(day(1), Column::CaloriesTotal), 2500.0);
    approx(table.value(day(1), Column::Bmi), 27.1);
    approx(table.value(day(1), Column::SleepDeep), 60.0);
    approx(table.value(day(1), Column::Spo2Avg), 96.5);
    approx(table.value(day(1), Column::Rmssd), 42.5);
    approx(table.value(day(1), Column::StressScore), 78.0);
    approx(table.value(day(1), Column::SedentaryMinutes), 600.0);
    assert_eq!(table.value(day(2), Column::StressScore), None);
    assert!(merged.categories.iter().all(|c| c.files_failed == 0));
    assert_eq!(merged.categories.iter().filter(|c| c.days > 0).count(), 11);
}

#[test]
fn test_later_file_wins_for_duplicate_day() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let table = run(root.path());
    approx(table.value(day(1), Column::RestingBpm), 65.0);
}

#[test]
fn test_sleep_score_uses_utc_day() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let table = run(root.path());
    // 23:30 at -05:00 on the 2nd is the 3rd in UTC.
    approx(table.value(day(2), Column::OverallScore), 75.0);
    approx(table.value(day(3), Column::OverallScore), 70.0);
}

#[test]
fn test_weight_converted_to_kilograms() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let table = run(root.path());
    approx(table.value(day(1), Column::Weight), 90.7);
    assert_eq!(table.value(day(2), Column::Weight), None);
    approx(table.value(day(3), Column::WeightFilled), 90.7);
}

#[test]
fn test_activity_columns_zero_filled() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let table = run(root.path());
    for d in [2, 3] {
        approx(table.value(day(d), Column::VeryActiveMinutes), 0.0);
        approx(table.value(day(d), Column::ModeratelyActiveMinutes), 0.0);
        approx(table.value(day(d), Column::LightlyActiveMinutes), 0.0);
        approx(table.value(day(d), Column::SedentaryMinutes), 0.0);
    }
}

#[test]
fn test_window_refilter_is_noop_after_merge() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let mut table = merge_all(root.path(), &window()).unwrap().unwrap().table;
    let before = table.clone();
    assert_eq!(apply_window(&mut table, &window()), 0);
    assert_eq!(table, before);
}

#[test]
fn test_pipeline_is_idempotent() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    assert_eq!(run(root.path()), run(root.path()));
}

// ── Metrics properties ────────────────────────────────────────────────────────

#[test]
fn test_readiness_from_z_scores() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let table = run(root.path());

    // Sleep 80/75/70 → z = 1, 0, -1. Resting bpm 65/-/58 → z = ±1/sqrt(2).
    let half_root_two = 1.0 / 2f64.sqrt();
    approx(table.value(day(1), Column::ReadinessRaw), 1.0 - half_root_two);
    approx(table.value(day(3), Column::ReadinessRaw), -1.0 + half_root_two);
    assert_eq!(table.value(day(2), Column::ReadinessRaw), None);
}

#[test]
fn test_metabolic_metrics() {
    let root = TempDir::new().unwrap();
    full_export(root.path());

    let table = run(root.path());

    // 10 * 90.7 + 6.25 * 180 - 5 * 38 + 5
    let bmr = 1847.0;
    approx(table.value(day(1), Column::Bmr), bmr);
    approx(table.value(day(1), Column::ActiveCalories), 2500.0 - bmr);
    approx(table.value(day(2), Column::ActiveCalories), 0.0);

    approx(table.value(day(1), Column::TotalActiveMinutes), 50.0);
    approx(table.value(day(1), Column::IntensityIndex), (2500.0 - bmr) / 50.0);

    // No active minutes → intensity index 0 rather than missing.
    approx(table.value(day(3), Column::TotalActiveMinutes), 0.0);
    approx(table.value(day(3), Column::IntensityIndex), 0.0);
}

#[test]
fn test_bmr_reference_value() {
    let root = TempDir::new().unwrap();
    write(
        root.path(),
        GLOBAL,
        "calories-2024-04-01.json",
        r#"[{"dateTime": "04/01/24 00:00:00", "value": "2500"}]"#,
    );
    write(
        root.path(),
        GLOBAL,
        "weight-2024-04-01.json",
        r#"[{"date": "04/01/24", "weight": 176.4}]"#,
    );

    let table = run(root.path());
    approx(table.value(day(1), Column::Weight), 80.0);
    approx(table.value(day(1), Column::Bmr), 1740.0);
    approx(table.value(day(1), Column::ActiveCalories), 760.0);
}

#[test]
fn test_fallback_weight_without_weight_files() {
    let root = TempDir::new().unwrap();
    write(
        root.path(),
        GLOBAL,
        "calories-2024-04-01.json",
        r#"[{"dateTime": "04/01/24 00:00:00", "value": "2500"}]"#,
    );

    let table = run(root.path());
    approx(table.value(day(1), Column::WeightFilled), 75.0);
    approx(table.value(day(1), Column::Bmr), 1690.0);
}

#[test]
fn test_constant_inputs_leave_readiness_missing() {
    let root = TempDir::new().unwrap();
    write(
        root.path(),
        GLOBAL,
        "calories-2024-04-01.json",
        r#"[
            {"dateTime": "04/01/24 00:00:00", "value": "2000"},
            {"dateTime": "04/02/24 00:00:00", "value": "2100"}
        ]"#,
    );
    write(
        root.path(),
        GLOBAL,
        "resting_heart_rate-2024-04-01.json",
        r#"[
            {"value": {"date": "04/01/24", "value": 60}},
            {"value": {"date": "04/02/24", "value": 60}}
        ]"#,
    );
    write(
        root.path(),
        "Sleep Score",
        "sleep_score.csv",
        "timestamp,overall_score\n2024-04-01T07:00:00Z,80\n2024-04-02T07:00:00Z,80\n",
    );

    let table = run(root.path());
    assert_eq!(table.len(), 2);
    assert_eq!(table.value(day(1), Column::ReadinessRaw), None);
    assert_eq!(table.value(day(2), Column::ReadinessRaw), None);
}

// ── Failure modes ─────────────────────────────────────────────────────────────

#[test]
fn test_missing_root_is_error() {
    let root = TempDir::new().unwrap();
    let err = merge_all(&root.path().join("absent"), &window()).unwrap_err();
    assert!(matches!(err, HealthError::DataPathNotFound(_)));
}

#[test]
fn test_empty_root_is_no_data() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join(GLOBAL)).unwrap();
    assert!(merge_all(root.path(), &window()).unwrap().is_none());
}

#[test]
fn test_corrupt_file_is_skipped() {
    let root = TempDir::new().unwrap();
    full_export(root.path());
    write(root.path(), GLOBAL, "weight-2024-05-01.json", "{\"oops\": ");

    let merged = merge_all(root.path(), &window()).unwrap().unwrap();
    let failed: usize = merged.categories.iter().map(|c| c.files_failed).sum();
    assert_eq!(failed, 1);
    approx(merged.table.value(day(1), Column::Weight), 90.7);
}
