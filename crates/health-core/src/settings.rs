use chrono::NaiveDate;
use clap::{CommandFactory, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HealthError, Result};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Merge personal health-tracker exports into one daily table
#[derive(Parser, Debug, Clone)]
#[command(
    name = "health-etl",
    about = "Merge personal health-tracker exports into one daily table",
    version
)]
pub struct Settings {
    /// Root directory holding the per-category export folders
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// First day to keep (inclusive, YYYY-MM-DD)
    #[arg(long, default_value = "2024-04-01")]
    pub start_date: NaiveDate,

    /// Last day to keep (inclusive, YYYY-MM-DD); unbounded when absent
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    /// Body height in centimetres
    #[arg(long, default_value = "180")]
    pub height_cm: f64,

    /// Age in years
    #[arg(long, default_value = "38")]
    pub age: u32,

    /// Biological sex used by the BMR formula
    #[arg(long, value_enum, default_value = "male")]
    pub sex: Sex,

    /// Directory the exported table is written to
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// JSON config file supplying any option not given on the command line
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// Biological sex flag selecting the Mifflin–St Jeor constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Sex-dependent additive term of the Mifflin–St Jeor equation.
    pub fn bmr_term(self) -> f64 {
        match self {
            Sex::Male => 5.0,
            Sex::Female => -161.0,
        }
    }
}

// ── ConfigFile ─────────────────────────────────────────────────────────────────

/// Optional JSON config file. Every field is optional; the command line wins.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Load a config file. Unlike an absent `--config`, a named file that is
    /// missing or malformed is a configuration error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| HealthError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content)
            .map_err(|e| HealthError::Config(format!("{}: {}", path.display(), e)))
    }
}

// ── Run configuration ─────────────────────────────────────────────────────────

/// Inclusive calendar-day window. The start is mandatory, the end optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Result<Self> {
        if let Some(end) = end {
            if end < start {
                return Err(HealthError::Config(format!(
                    "end date {} is before start date {}",
                    end, start
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Window with no upper bound.
    pub fn starting(start: NaiveDate) -> Self {
        Self { start, end: None }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && self.end.map_or(true, |end| day <= end)
    }
}

/// Body constants consumed by the BMR formula only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyProfile {
    pub height_cm: f64,
    pub age: u32,
    pub sex: Sex,
}

/// Immutable parameters of one run, built once by [`Settings::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct HealthConfig {
    pub data_root: PathBuf,
    pub window: DateWindow,
    pub body: BodyProfile,
    pub output_dir: PathBuf,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and merge in the optional config file.
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`load`](Self::load) with an explicit argument list.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Result<Self> {
        // Build raw ArgMatches so we can query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if let Some(path) = settings.config.clone() {
            let file = ConfigFile::load_from(&path)?;
            settings.merge_config_file(file, &matches);
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        Ok(settings)
    }

    /// Fill every field that was not explicitly set on the command line from
    /// `file`.
    fn merge_config_file(&mut self, file: ConfigFile, matches: &clap::ArgMatches) {
        // NOTE: clap stores the arg id using the *field name* (underscores).
        if !is_arg_explicitly_set(matches, "data_dir") {
            if let Some(v) = file.data_dir {
                self.data_dir = v;
            }
        }
        if !is_arg_explicitly_set(matches, "start_date") {
            if let Some(v) = file.start_date {
                self.start_date = v;
            }
        }
        if !is_arg_explicitly_set(matches, "end_date") && self.end_date.is_none() {
            self.end_date = file.end_date;
        }
        if !is_arg_explicitly_set(matches, "height_cm") {
            if let Some(v) = file.height_cm {
                self.height_cm = v;
            }
        }
        if !is_arg_explicitly_set(matches, "age") {
            if let Some(v) = file.age {
                self.age = v;
            }
        }
        if !is_arg_explicitly_set(matches, "sex") {
            if let Some(v) = file.sex {
                self.sex = v;
            }
        }
        if !is_arg_explicitly_set(matches, "output_dir") {
            if let Some(v) = file.output_dir {
                self.output_dir = v;
            }
        }
    }

    /// Validate the settings and freeze them into a [`HealthConfig`].
    pub fn resolve(&self) -> Result<HealthConfig> {
        if !(self.height_cm.is_finite() && self.height_cm > 0.0) {
            return Err(HealthError::Config(format!(
                "height must be a positive number of centimetres, got {}",
                self.height_cm
            )));
        }

        Ok(HealthConfig {
            data_root: expand_home(&self.data_dir),
            window: DateWindow::new(self.start_date, self.end_date)?,
            body: BodyProfile {
                height_cm: self.height_cm,
                age: self.age,
                sex: self.sex,
            },
            output_dir: expand_home(&self.output_dir),
        })
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
