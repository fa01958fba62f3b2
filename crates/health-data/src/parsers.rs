//! One parser per export format.
//!
//! Every parser takes the raw content of a single file and returns either
//! `Ok(None)` (no usable records) or a [`DailyFrame`] carrying only the
//! columns of its format. Recoverable quirks such as missing optional fields
//! drop the affected record; an `Err` means the file could not be read as its
//! container format at all and the caller skips it.

use chrono::NaiveDate;
use health_core::error::{HealthError, Result};
use health_core::models::{Aggregation, Column, DailyFrame, DayRecord};
use health_core::time_utils::DayParser;
use serde_json::Value;

/// Pounds to kilograms.
pub const LBS_TO_KG: f64 = 0.453592;

// ── SourceFormat ──────────────────────────────────────────────────────────────

/// Closed set of supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `resting_heart_rate-*.json`: `[{"value": {"date": "MM/DD/YY", "value": bpm}}]`.
    RestingHeartRate,
    /// `weight-*.json`: `[{"date": "MM/DD/YY", "weight": lbs, "bmi": x}]`.
    Weight,
    /// `sleep_score.csv`: one row per sleep, ISO timestamp with offset.
    SleepScore,
    /// `sleep-*.json`: detailed logs with per-stage minute summaries.
    SleepStages,
    /// `Daily SpO2 - *.csv`: UTC timestamps, average/lower/upper bounds.
    Spo2,
    /// `Daily Heart Rate Variability Summary - *.csv`.
    Hrv,
    /// `Stress Score.csv`.
    Stress,
    /// `<category>-*.json` with one `{"dateTime", "value"}` per day; the value
    /// lands in the given column.
    SimpleActivity(Column),
    /// `calories-*.json`: minute-level values summed per day.
    CaloriesIntraday,
}

impl SourceFormat {
    /// Parse one file's content.
    pub fn parse(self, content: &str) -> Result<Option<DailyFrame>> {
        let frame = match self {
            SourceFormat::RestingHeartRate => parse_resting_heart_rate(content)?,
            SourceFormat::Weight => parse_weight(content)?,
            SourceFormat::SleepScore => parse_sleep_score(content)?,
            SourceFormat::SleepStages => parse_sleep_stages(content)?,
            SourceFormat::Spo2 => parse_spo2(content)?,
            SourceFormat::Hrv => parse_hrv(content)?,
            SourceFormat::Stress => parse_stress(content)?,
            SourceFormat::SimpleActivity(column) => parse_simple_activity(content, column)?,
            SourceFormat::CaloriesIntraday => parse_calories_intraday(content)?,
        };
        Ok(if frame.is_empty() { None } else { Some(frame) })
    }
}

// ── JSON formats ──────────────────────────────────────────────────────────────

fn parse_resting_heart_rate(content: &str) -> Result<DailyFrame> {
    let mut frame = DailyFrame::new();
    for entry in json_array(content)? {
        let Some(inner) = entry.get("value") else {
            continue;
        };
        let date = inner.get("date").and_then(non_blank);
        // A zero reading is the export's placeholder for "no value".
        let bpm = inner.get("value").and_then(number).filter(|v| *v != 0.0);
        let (Some(date), Some(bpm)) = (date, bpm) else {
            continue;
        };
        let day = DayParser::short_us_date(date)?;
        frame.push(day, DayRecord::from_pairs([(Column::RestingBpm, bpm)]));
    }
    Ok(frame)
}

fn parse_weight(content: &str) -> Result<DailyFrame> {
    let mut frame = DailyFrame::new();
    for entry in json_array(content)? {
        let date = entry.get("date").and_then(non_blank);
        let weight = entry.get("weight").and_then(number);
        let (Some(date), Some(weight)) = (date, weight) else {
            continue;
        };
        let day = DayParser::short_us_date(date)?;
        let mut record = DayRecord::from_pairs([(Column::Weight, lbs_to_kg(weight))]);
        if let Some(bmi) = entry.get("bmi").and_then(number) {
            record.set(Column::Bmi, bmi);
        }
        frame.push(day, record);
    }
    // Several weigh-ins on one day: the first one in the file counts.
    Ok(frame.keep_first().into())
}

fn parse_sleep_stages(content: &str) -> Result<DailyFrame> {
    let mut frame = DailyFrame::new();
    for entry in json_array(content)? {
        let Some(date) = entry.get("dateOfSleep").and_then(Value::as_str) else {
            continue;
        };
        let day = DayParser::iso_date(date)?;
        let summary = entry.get("levels").and_then(|l| l.get("summary"));
        let minutes = |stage: &str| -> f64 {
            summary
                .and_then(|s| s.get(stage))
                .and_then(|s| s.get("minutes"))
                .and_then(number)
                .unwrap_or(0.0)
        };

        // "classic" logs report asleep/restless/awake, "stages" logs report
        // light/deep/rem/wake.
        let record = DayRecord::from_pairs([
            (Column::SleepDeep, minutes("deep")),
            (Column::SleepLight, minutes("light") + minutes("asleep")),
            (Column::SleepRem, minutes("rem")),
            (
                Column::SleepAwake,
                minutes("wake") + minutes("awake") + minutes("restless"),
            ),
        ]);
        frame.push(day, record);
    }
    // Naps and the main sleep add up.
    Ok(frame.collapse_sum().into())
}

fn parse_simple_activity(content: &str, column: Column) -> Result<DailyFrame> {
    let mut frame = DailyFrame::new();
    for (day, value) in timestamped_values(content)? {
        let mut record = DayRecord::new();
        if let Some(v) = value {
            record.set(column, v);
        }
        frame.push(day, record);
    }
    Ok(frame)
}

fn parse_calories_intraday(content: &str) -> Result<DailyFrame> {
    let mut frame = DailyFrame::new();
    for (day, value) in timestamped_values(content)? {
        let mut record = DayRecord::new();
        if let Some(v) = value {
            record.set(Column::CaloriesTotal, v);
        }
        frame.push(day, record);
    }
    Ok(frame.collapse_sum().into())
}

/// `[{"dateTime": "MM/DD/YY HH:MM:SS", "value": "12"}]` → `(day, value)`.
/// Values that are not numeric become `None`; entries without a timestamp
/// are dropped.
fn timestamped_values(content: &str) -> Result<Vec<(NaiveDate, Option<f64>)>> {
    let mut out = Vec::new();
    for entry in json_array(content)? {
        let Some(ts) = entry.get("dateTime").and_then(Value::as_str) else {
            continue;
        };
        let day = DayParser::short_us_datetime(ts)?;
        out.push((day, entry.get("value").and_then(number)));
    }
    Ok(out)
}

// ── CSV formats ───────────────────────────────────────────────────────────────

fn parse_sleep_score(content: &str) -> Result<DailyFrame> {
    let doc = CsvDocument::read(content, false)?;
    let ts = doc.require("timestamp")?;
    let columns = [
        (doc.index("overall_score"), Column::OverallScore),
        (doc.index("deep_sleep_in_minutes"), Column::DeepSleepInMinutes),
        (doc.index("restlessness"), Column::Restlessness),
    ];

    let mut frame = DailyFrame::new();
    for row in &doc.rows {
        let Some(stamp) = row.get(ts).filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        let day = DayParser::utc_day(stamp)?;
        let record = DayRecord::from_pairs(
            columns
                .iter()
                .filter_map(|(idx, col)| cell_number(row, *idx).map(|v| (*col, v))),
        );
        frame.push(day, record);
    }

    Ok(frame
        .aggregate(|column| match column {
            Column::OverallScore => Aggregation::Max,
            Column::DeepSleepInMinutes => Aggregation::Sum,
            _ => Aggregation::Mean,
        })
        .into())
}

fn parse_spo2(content: &str) -> Result<DailyFrame> {
    let doc = CsvDocument::read(content, false)?;
    let ts = doc.require("timestamp")?;
    let columns = [
        (doc.index("average_value"), Column::Spo2Avg),
        (doc.index("lower_bound"), Column::Spo2Min),
        (doc.index("upper_bound"), Column::Spo2Max),
    ];
    if columns.iter().all(|(idx, _)| idx.is_none()) {
        return Err(HealthError::MissingColumn("average_value".to_string()));
    }

    let mut frame = DailyFrame::new();
    for row in &doc.rows {
        let Some(stamp) = row.get(ts).filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        let day = DayParser::utc_day(stamp)?;
        let record = DayRecord::from_pairs(
            columns
                .iter()
                .filter_map(|(idx, col)| cell_number(row, *idx).map(|v| (*col, v))),
        );
        frame.push(day, record);
    }
    Ok(frame.collapse_mean().into())
}

fn parse_hrv(content: &str) -> Result<DailyFrame> {
    let doc = CsvDocument::read(content, false)?;
    let rmssd = doc.require("rmssd")?;
    let ts = doc.require("timestamp")?;

    let mut frame = DailyFrame::new();
    for row in &doc.rows {
        let Some(stamp) = row.get(ts).filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        let day = DayParser::local_day(stamp)?;
        let mut record = DayRecord::new();
        if let Some(v) = cell_number(row, Some(rmssd)) {
            record.set(Column::Rmssd, v);
        }
        frame.push(day, record);
    }
    Ok(frame)
}

fn parse_stress(content: &str) -> Result<DailyFrame> {
    let doc = CsvDocument::read(content, true)?;
    let date = doc.require("DATE")?;
    let score = doc.require("STRESS_SCORE")?;

    let mut frame = DailyFrame::new();
    for row in &doc.rows {
        // Non-positive scores mark days without a measurement.
        let Some(value) = cell_number(row, Some(score)).filter(|v| *v > 0.0) else {
            continue;
        };
        let Some(stamp) = row.get(date).filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        let day = DayParser::local_day(stamp)?;
        frame.push(day, DayRecord::from_pairs([(Column::StressScore, value)]));
    }
    Ok(frame)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Convert pounds to kilograms, rounded to one decimal.
pub fn lbs_to_kg(lbs: f64) -> f64 {
    (lbs * LBS_TO_KG * 10.0).round() / 10.0
}

/// A string field with something in it; blank strings count as missing.
fn non_blank(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

/// Parse `content` as a JSON array of records.
fn json_array(content: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(content)? {
        Value::Array(items) => Ok(items),
        other => Err(HealthError::UnexpectedShape(format!(
            "expected a JSON array, found {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Numeric JSON value, accepting numbers encoded as strings.
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// A CSV file with a header row, held fully in memory.
struct CsvDocument {
    headers: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl CsvDocument {
    /// Read `content`; `trim_headers` strips whitespace around column names.
    fn read(content: &str, trim_headers: bool) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(if trim_headers {
                csv::Trim::Headers
            } else {
                csv::Trim::None
            })
            .from_reader(content.as_bytes());

        let headers = reader.headers()?.iter().map(str::to_string).collect();
        let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { headers, rows })
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.index(name)
            .ok_or_else(|| HealthError::MissingColumn(name.to_string()))
    }
}

fn cell_number(row: &csv::StringRecord, idx: Option<usize>) -> Option<f64> {
    row.get(idx?)
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
