//! Registry of the known export categories: where each lives, which files
//! belong to it and how they are parsed.

use health_core::models::Column;

use crate::parsers::SourceFormat;

const GLOBAL_EXPORT: &str = "Global Export Data";

/// One export file family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCategory {
    RestingHeartRate,
    Weight,
    Calories,
    SleepScore,
    SleepStages,
    Spo2,
    HeartRateVariability,
    StressScore,
    VeryActiveMinutes,
    ModeratelyActiveMinutes,
    LightlyActiveMinutes,
    SedentaryMinutes,
}

impl SourceCategory {
    /// Every category in loading order. The first non-empty one seeds the
    /// merged table.
    pub const ALL: [SourceCategory; 12] = [
        SourceCategory::RestingHeartRate,
        SourceCategory::Weight,
        SourceCategory::Calories,
        SourceCategory::SleepScore,
        SourceCategory::SleepStages,
        SourceCategory::Spo2,
        SourceCategory::HeartRateVariability,
        SourceCategory::StressScore,
        SourceCategory::VeryActiveMinutes,
        SourceCategory::ModeratelyActiveMinutes,
        SourceCategory::LightlyActiveMinutes,
        SourceCategory::SedentaryMinutes,
    ];

    /// Short label used in logs; for activity categories this is also the
    /// name of the column they fill.
    pub fn label(self) -> &'static str {
        match self {
            SourceCategory::RestingHeartRate => "resting_heart_rate",
            SourceCategory::Weight => "weight",
            SourceCategory::Calories => "calories",
            SourceCategory::SleepScore => "sleep_score",
            SourceCategory::SleepStages => "sleep",
            SourceCategory::Spo2 => "spo2",
            SourceCategory::HeartRateVariability => "hrv",
            SourceCategory::StressScore => "stress_score",
            SourceCategory::VeryActiveMinutes => "very_active_minutes",
            SourceCategory::ModeratelyActiveMinutes => "moderately_active_minutes",
            SourceCategory::LightlyActiveMinutes => "lightly_active_minutes",
            SourceCategory::SedentaryMinutes => "sedentary_minutes",
        }
    }

    /// Sub-directory of the data root holding this category's files.
    pub fn folder(self) -> &'static str {
        match self {
            SourceCategory::SleepScore => "Sleep Score",
            SourceCategory::Spo2 => "Oxygen Saturation (SpO2)",
            SourceCategory::HeartRateVariability => "Heart Rate Variability",
            SourceCategory::StressScore => "Stress Score",
            _ => GLOBAL_EXPORT,
        }
    }

    /// File-name glob inside [`folder`](Self::folder).
    pub fn pattern(self) -> &'static str {
        match self {
            SourceCategory::RestingHeartRate => "resting_heart_rate-*.json",
            SourceCategory::Weight => "weight-*.json",
            SourceCategory::Calories => "calories-*.json",
            SourceCategory::SleepScore => "sleep_score.csv",
            SourceCategory::SleepStages => "sleep-*.json",
            SourceCategory::Spo2 => "Daily SpO2 - *.csv",
            SourceCategory::HeartRateVariability => {
                "Daily Heart Rate Variability Summary - *.csv"
            }
            SourceCategory::StressScore => "Stress Score.csv",
            SourceCategory::VeryActiveMinutes => "very_active_minutes-*.json",
            SourceCategory::ModeratelyActiveMinutes => "moderately_active_minutes-*.json",
            SourceCategory::LightlyActiveMinutes => "lightly_active_minutes-*.json",
            SourceCategory::SedentaryMinutes => "sedentary_minutes-*.json",
        }
    }

    /// Parser for this category's files.
    pub fn format(self) -> SourceFormat {
        match self {
            SourceCategory::RestingHeartRate => SourceFormat::RestingHeartRate,
            SourceCategory::Weight => SourceFormat::Weight,
            SourceCategory::Calories => SourceFormat::CaloriesIntraday,
            SourceCategory::SleepScore => SourceFormat::SleepScore,
            SourceCategory::SleepStages => SourceFormat::SleepStages,
            SourceCategory::Spo2 => SourceFormat::Spo2,
            SourceCategory::HeartRateVariability => SourceFormat::Hrv,
            SourceCategory::StressScore => SourceFormat::Stress,
            // Column named after the category, not the file content.
            SourceCategory::VeryActiveMinutes => {
                SourceFormat::SimpleActivity(Column::VeryActiveMinutes)
            }
            SourceCategory::ModeratelyActiveMinutes => {
                SourceFormat::SimpleActivity(Column::ModeratelyActiveMinutes)
            }
            SourceCategory::LightlyActiveMinutes => {
                SourceFormat::SimpleActivity(Column::LightlyActiveMinutes)
            }
            SourceCategory::SedentaryMinutes => {
                SourceFormat::SimpleActivity(Column::SedentaryMinutes)
            }
        }
    }

    /// Columns this category may contribute.
    pub fn columns(self) -> &'static [Column] {
        match self {
            SourceCategory::RestingHeartRate => &[Column::RestingBpm],
            SourceCategory::Weight => &[Column::Weight, Column::Bmi],
            SourceCategory::Calories => &[Column::CaloriesTotal],
            SourceCategory::SleepScore => &[
                Column::OverallScore,
                Column::DeepSleepInMinutes,
                Column::Restlessness,
            ],
            SourceCategory::SleepStages => &[
                Column::SleepDeep,
                Column::SleepLight,
                Column::SleepRem,
                Column::SleepAwake,
            ],
            SourceCategory::Spo2 => &[Column::Spo2Avg, Column::Spo2Min, Column::Spo2Max],
            SourceCategory::HeartRateVariability => &[Column::Rmssd],
            SourceCategory::StressScore => &[Column::StressScore],
            SourceCategory::VeryActiveMinutes => &[Column::VeryActiveMinutes],
            SourceCategory::ModeratelyActiveMinutes => &[Column::ModeratelyActiveMinutes],
            SourceCategory::LightlyActiveMinutes => &[Column::LightlyActiveMinutes],
            SourceCategory::SedentaryMinutes => &[Column::SedentaryMinutes],
        }
    }
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
