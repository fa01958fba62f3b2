//! Data ingestion layer for the health ETL.
//!
//! Responsible for discovering and parsing tracker export files, loading each
//! category into a per-source table, merging them into the Daily Record
//! Table and running the top-level analysis pipeline.

pub mod analysis;
pub mod loader;
pub mod merge;
pub mod parsers;
pub mod reader;
pub mod sources;

pub use health_core as core;
