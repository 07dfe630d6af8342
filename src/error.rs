//! Error types for Synheart Trends

use thiserror::Error;

/// Errors that can occur while parsing records or producing reports
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse record payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid UTC offset: {0}")]
    InvalidTimezone(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Unsupported metric: {0}")]
    UnsupportedMetric(String),
}

/// Errors reported by the health-data provider boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Health data provider is unavailable: {0}")]
    Unavailable(String),

    #[error("Permission denied for {0}")]
    PermissionDenied(String),

    #[error("Provider has not been initialized")]
    NotInitialized,

    #[error("Fetch failed: {0}")]
    FetchFailed(String),
}
