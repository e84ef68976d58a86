//! Error types for the prospector crate

use thiserror::Error;

/// Result type for prospector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for prospector operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Source/Binding catalog error
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// No Binding matched a URL (configuration gap)
    #[error("No binding resolves {0}")]
    Resolution(String),

    /// Scheduling error
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// Fetch error
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Content normalization error
    #[error("Normalize error: {0}")]
    Normalize(String),

    /// Extraction error
    #[error("Extract error: {0}")]
    Extract(String),

    /// Pipeline error
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
