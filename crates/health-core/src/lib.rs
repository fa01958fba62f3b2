//! Shared vocabulary for the health ETL: the Daily Record Table, its column
//! catalogue, run configuration, errors and the derived-metric engine.

pub mod error;
pub mod metrics;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{HealthError, Result};
