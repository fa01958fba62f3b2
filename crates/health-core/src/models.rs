use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use crate::error::Result;

/// Date format used whenever a calendar day is serialized.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

// ── Column ────────────────────────────────────────────────────────────────────

/// Every named field a Daily Record Table row can carry.
///
/// Declaration order is the canonical output order used by the exporters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    RestingBpm,
    Weight,
    Bmi,
    CaloriesTotal,
    OverallScore,
    DeepSleepInMinutes,
    Restlessness,
    SleepDeep,
    SleepLight,
    SleepRem,
    SleepAwake,
    Spo2Avg,
    Spo2Min,
    Spo2Max,
    Rmssd,
    StressScore,
    VeryActiveMinutes,
    ModeratelyActiveMinutes,
    LightlyActiveMinutes,
    SedentaryMinutes,
    ReadinessRaw,
    WeightFilled,
    Bmr,
    ActiveCalories,
    TotalActiveMinutes,
    IntensityIndex,
}

/// Columns where a missing value means "nothing happened" rather than
/// "nothing was measured".
const ZERO_FILLED: &[Column] = &[
    Column::VeryActiveMinutes,
    Column::ModeratelyActiveMinutes,
    Column::LightlyActiveMinutes,
    Column::SedentaryMinutes,
    Column::CaloriesTotal,
    Column::SleepDeep,
    Column::SleepLight,
    Column::SleepRem,
    Column::SleepAwake,
];

impl Column {
    /// All columns in canonical order.
    pub const ALL: [Column; 26] = [
        Column::RestingBpm,
        Column::Weight,
        Column::Bmi,
        Column::CaloriesTotal,
        Column::OverallScore,
        Column::DeepSleepInMinutes,
        Column::Restlessness,
        Column::SleepDeep,
        Column::SleepLight,
        Column::SleepRem,
        Column::SleepAwake,
        Column::Spo2Avg,
        Column::Spo2Min,
        Column::Spo2Max,
        Column::Rmssd,
        Column::StressScore,
        Column::VeryActiveMinutes,
        Column::ModeratelyActiveMinutes,
        Column::LightlyActiveMinutes,
        Column::SedentaryMinutes,
        Column::ReadinessRaw,
        Column::WeightFilled,
        Column::Bmr,
        Column::ActiveCalories,
        Column::TotalActiveMinutes,
        Column::IntensityIndex,
    ];

    /// Serialized column name.
    pub fn name(self) -> &'static str {
        match self {
            Column::RestingBpm => "resting_bpm",
            Column::Weight => "weight",
            Column::Bmi => "bmi",
            Column::CaloriesTotal => "calories_total",
            Column::OverallScore => "overall_score",
            Column::DeepSleepInMinutes => "deep_sleep_in_minutes",
            Column::Restlessness => "restlessness",
            Column::SleepDeep => "sleep_deep",
            Column::SleepLight => "sleep_light",
            Column::SleepRem => "sleep_rem",
            Column::SleepAwake => "sleep_awake",
            Column::Spo2Avg => "spo2_avg",
            Column::Spo2Min => "spo2_min",
            Column::Spo2Max => "spo2_max",
            Column::Rmssd => "rmssd",
            Column::StressScore => "stress_score",
            Column::VeryActiveMinutes => "very_active_minutes",
            Column::ModeratelyActiveMinutes => "moderately_active_minutes",
            Column::LightlyActiveMinutes => "lightly_active_minutes",
            Column::SedentaryMinutes => "sedentary_minutes",
            Column::ReadinessRaw => "readiness_raw",
            Column::WeightFilled => "weight_filled",
            Column::Bmr => "bmr",
            Column::ActiveCalories => "active_calories",
            Column::TotalActiveMinutes => "total_active_minutes",
            Column::IntensityIndex => "intensity_index",
        }
    }

    /// Whether a missing value in this column is logically zero.
    pub fn is_zero_filled(self) -> bool {
        ZERO_FILLED.contains(&self)
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ── DayRecord ─────────────────────────────────────────────────────────────────

/// Sparse row of one calendar day: an absent key means "no measurement".
///
/// Non-finite values are never stored; writing one clears the column instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayRecord {
    values: BTreeMap<Column, f64>,
}

impl DayRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Column, f64)>) -> Self {
        let mut record = Self::new();
        for (column, value) in pairs {
            record.set(column, value);
        }
        record
    }

    pub fn get(&self, column: Column) -> Option<f64> {
        self.values.get(&column).copied()
    }

    /// Store `value` under `column`; NaN and infinities clear the column.
    pub fn set(&mut self, column: Column, value: f64) {
        if value.is_finite() {
            self.values.insert(column, value);
        } else {
            self.values.remove(&column);
        }
    }

    pub fn remove(&mut self, column: Column) -> Option<f64> {
        self.values.remove(&column)
    }

    pub fn contains(&self, column: Column) -> bool {
        self.values.contains_key(&column)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Columns present in this record, in canonical order.
    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, f64)> + '_ {
        self.values.iter().map(|(c, v)| (*c, *v))
    }

    /// Copy every value of `other` into `self`, overwriting shared columns.
    pub fn merge_from(&mut self, other: &DayRecord) {
        for (column, value) in other.iter() {
            self.values.insert(column, value);
        }
    }
}

// ── Aggregation ───────────────────────────────────────────────────────────────

/// How several values of one column on the same day collapse to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
    Max,
    First,
    Last,
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u32,
    max: f64,
    first: f64,
    last: f64,
}

impl Accumulator {
    fn new(value: f64) -> Self {
        Self {
            sum: value,
            count: 1,
            max: value,
            first: value,
            last: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.max = self.max.max(value);
        self.last = value;
    }

    fn finish(&self, how: Aggregation) -> f64 {
        match how {
            Aggregation::Sum => self.sum,
            Aggregation::Mean => self.sum / f64::from(self.count),
            Aggregation::Max => self.max,
            Aggregation::First => self.first,
            Aggregation::Last => self.last,
        }
    }
}

// ── DailyFrame ────────────────────────────────────────────────────────────────

/// Ordered list of day rows that may still contain the same day more than
/// once, as produced by a parser or by concatenating several files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyFrame {
    rows: Vec<(NaiveDate, DayRecord)>,
}

impl DailyFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, day: NaiveDate, record: DayRecord) {
        self.rows.push((day, record));
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[(NaiveDate, DayRecord)] {
        &self.rows
    }

    /// Append all rows of `other`, preserving order.
    pub fn extend(&mut self, other: DailyFrame) {
        self.rows.extend(other.rows);
    }

    pub fn has_duplicate_days(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.rows.iter().any(|(day, _)| !seen.insert(*day))
    }

    /// Keep the first row of every day, dropping later ones whole.
    pub fn keep_first(self) -> DailyTable {
        let mut table = DailyTable::new();
        for (day, record) in self.rows {
            table.days.entry(day).or_insert(record);
        }
        table
    }

    /// Keep the last row of every day, dropping earlier ones whole.
    pub fn keep_last(self) -> DailyTable {
        let mut table = DailyTable::new();
        for (day, record) in self.rows {
            table.days.insert(day, record);
        }
        table
    }

    /// Group rows by day, combining each column with the policy `how`
    /// returns for it. Missing values are skipped, never treated as zero.
    pub fn aggregate(self, how: impl Fn(Column) -> Aggregation) -> DailyTable {
        let mut groups: BTreeMap<NaiveDate, BTreeMap<Column, Accumulator>> = BTreeMap::new();
        for (day, record) in self.rows {
            let group = groups.entry(day).or_default();
            for (column, value) in record.iter() {
                group
                    .entry(column)
                    .and_modify(|acc| acc.push(value))
                    .or_insert_with(|| Accumulator::new(value));
            }
        }

        let mut table = DailyTable::new();
        for (day, group) in groups {
            let record = DayRecord::from_pairs(
                group
                    .into_iter()
                    .map(|(column, acc)| (column, acc.finish(how(column)))),
            );
            table.days.insert(day, record);
        }
        table
    }

    /// Arithmetic mean per day over every column.
    pub fn collapse_mean(self) -> DailyTable {
        self.aggregate(|_| Aggregation::Mean)
    }

    /// Sum per day over every column.
    pub fn collapse_sum(self) -> DailyTable {
        self.aggregate(|_| Aggregation::Sum)
    }
}

impl From<DailyTable> for DailyFrame {
    fn from(table: DailyTable) -> Self {
        Self {
            rows: table.days.into_iter().collect(),
        }
    }
}

// ── DailyTable ────────────────────────────────────────────────────────────────

/// The Daily Record Table: at most one sparse row per calendar day, kept in
/// ascending day order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyTable {
    days: BTreeMap<NaiveDate, DayRecord>,
}

impl DailyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Days in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.days.keys().next().copied()
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.days.keys().next_back().copied()
    }

    pub fn get(&self, day: NaiveDate) -> Option<&DayRecord> {
        self.days.get(&day)
    }

    pub fn value(&self, day: NaiveDate, column: Column) -> Option<f64> {
        self.days.get(&day).and_then(|r| r.get(column))
    }

    /// Insert or replace the whole row for `day`.
    pub fn insert(&mut self, day: NaiveDate, record: DayRecord) {
        self.days.insert(day, record);
    }

    /// Set one value, creating the row if needed.
    pub fn set(&mut self, day: NaiveDate, column: Column, value: f64) {
        self.days.entry(day).or_default().set(column, value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &DayRecord)> + '_ {
        self.days.iter().map(|(d, r)| (*d, r))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NaiveDate, &mut DayRecord)> + '_ {
        self.days.iter_mut().map(|(d, r)| (*d, r))
    }

    /// Columns present on at least one day, in canonical order.
    pub fn columns(&self) -> BTreeSet<Column> {
        self.days.values().flat_map(|r| r.columns()).collect()
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.days.values().any(|r| r.contains(column))
    }

    /// Present values of `column` in day order.
    pub fn series(&self, column: Column) -> Vec<f64> {
        self.days.values().filter_map(|r| r.get(column)).collect()
    }

    /// Full outer join on the day key. Every day of either side survives;
    /// where both sides carry the same column for a day, `other` wins.
    pub fn outer_join(&mut self, other: DailyTable) {
        for (day, record) in other.days {
            match self.days.get_mut(&day) {
                Some(existing) => existing.merge_from(&record),
                None => {
                    self.days.insert(day, record);
                }
            }
        }
    }

    /// Keep only the days for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(NaiveDate, &DayRecord) -> bool) {
        self.days.retain(|day, record| keep(*day, record));
    }

    /// Replace missing values of `column` with `0.0` on every day.
    pub fn fill_zero(&mut self, column: Column) {
        for record in self.days.values_mut() {
            if !record.contains(column) {
                record.set(column, 0.0);
            }
        }
    }

    /// Zero-fill every zero-fill column the table already carries.
    ///
    /// Returns the columns that were filled.
    pub fn fill_zero_columns(&mut self) -> Vec<Column> {
        let filled: Vec<Column> = self
            .columns()
            .into_iter()
            .filter(|c| c.is_zero_filled())
            .collect();
        for column in &filled {
            self.fill_zero(*column);
        }
        filled
    }

    /// Serialize as an array of records: `date` plus every column the table
    /// carries, with `null` for missing values.
    pub fn to_json_records(&self) -> serde_json::Value {
        let columns = self.columns();
        let rows = self
            .days
            .iter()
            .map(|(day, record)| {
                let mut row = serde_json::Map::new();
                row.insert(
                    "date".to_string(),
                    serde_json::Value::String(day.format(DAY_FORMAT).to_string()),
                );
                for column in &columns {
                    let value = record
                        .get(*column)
                        .map(serde_json::Value::from)
                        .unwrap_or(serde_json::Value::Null);
                    row.insert(column.name().to_string(), value);
                }
                serde_json::Value::Object(row)
            })
            .collect();
        serde_json::Value::Array(rows)
    }

    /// Write the table as CSV: a `date` header then the table's columns in
    /// canonical order; missing values become empty cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let columns: Vec<Column> = self.columns().into_iter().collect();
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec!["date".to_string()];
        header.extend(columns.iter().map(|c| c.name().to_string()));
        csv_writer.write_record(&header)?;

        for (day, record) in &self.days {
            let mut row = vec![day.format(DAY_FORMAT).to_string()];
            row.extend(
                columns
                    .iter()
                    .map(|c| record.get(*c).map(|v| v.to_string()).unwrap_or_default()),
            );
            csv_writer.write_record(&row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
