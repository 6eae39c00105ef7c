//! Error types for the direction-classification pipeline

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream API answered with an error payload or status
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Price rows violate ordering or value invariants
    #[error("Malformed price data: {0}")]
    MalformedPrices(String),

    /// Not enough rows survive indicator warm-up and label look-ahead
    #[error("Insufficient history: need at least {required} observations, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    /// A feature value is NaN or infinite
    #[error("Non-finite value in feature '{feature}' on {date}")]
    NonFiniteFeature { feature: String, date: String },

    /// Chronological split produced an empty partition
    #[error("Empty {partition} partition: {rows} rows with train fraction {fraction}")]
    EmptyPartition {
        partition: &'static str,
        rows: usize,
        fraction: f64,
    },

    /// Training labels contain a single class
    #[error("Training labels contain only class {class}; a binary classifier needs both")]
    SingleClassLabels { class: u8 },

    /// Model used before `fit`
    #[error("Model not trained: {0}")]
    NotTrained(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV read/write error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Errors caused by remote data sources rather than by the data itself
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Error::ApiError(_) | Error::NetworkError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientHistory {
            required: 51,
            available: 40,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient history: need at least 51 observations, got 40"
        );

        let err = Error::SingleClassLabels { class: 1 };
        assert!(err.to_string().contains("only class 1"));
    }

    #[test]
    fn test_source_failure() {
        assert!(Error::ApiError("boom".into()).is_source_failure());
        assert!(!Error::NotTrained("gbt".into()).is_source_failure());
    }
}
