use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the health ETL.
#[derive(Error, Debug)]
pub enum HealthError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A CSV document could not be parsed.
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// A date or timestamp string did not match the expected format.
    #[error("Invalid date format: {0}")]
    DateParse(String),

    /// A column required by a parser is absent from the file header.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// The document parsed, but its top-level shape is not what the format expects.
    #[error("Unexpected document shape: {0}")]
    UnexpectedShape(String),

    /// The configured data root does not exist or is not a directory.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the health crates.
pub type Result<T> = std::result::Result<T, HealthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = HealthError::FileRead {
            path: PathBuf::from("/data/weight-2024-04-01.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/weight-2024-04-01.json"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_date_parse() {
        let err = HealthError::DateParse("13/45/24".to_string());
        assert_eq!(err.to_string(), "Invalid date format: 13/45/24");
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = HealthError::MissingColumn("rmssd".to_string());
        assert_eq!(err.to_string(), "Missing required column: rmssd");
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = HealthError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = HealthError::Config("end date before start date".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: end date before start date"
        );
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: HealthError = json_err.into();
        assert!(matches!(err, HealthError::JsonParse(_)));
        assert!(err.to_string().starts_with("Failed to parse JSON"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: HealthError = io_err.into();
        assert!(matches!(err, HealthError::Io(_)));
        assert_eq!(err.to_string(), "denied");
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: HealthError = anyhow::anyhow!("something odd").into();
        assert!(matches!(err, HealthError::Other(_)));
        assert_eq!(err.to_string(), "something odd");
    }
}
