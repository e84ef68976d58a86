//! Error types for the extractor module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Capability-level failure of a single strategy invocation. Non-fatal to
/// the crawl unit: the extraction completes with whatever strategies
/// succeeded and records which ones failed.
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    /// The provider behind the strategy was unavailable
    #[error("Provider unavailable: {0}")]
    Provider(String),

    /// The strategy's declared schema could not be honored
    #[error("Malformed schema: {0}")]
    MalformedSchema(String),

    /// The invocation timed out at the capability level
    #[error("Strategy invocation timed out")]
    Timeout,

    /// The invocation was cancelled before completing
    #[error("Strategy invocation cancelled")]
    Cancelled,

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Error type for extraction as a whole
#[derive(Debug, Error)]
pub enum ExtractError {
    /// None of the binding's strategy ids resolve to a known descriptor.
    /// The pipeline treats this as failed validation and falls back to the
    /// next candidate binding, at most once.
    #[error("No usable strategies among {requested:?}")]
    NoUsableStrategies { requested: Vec<String> },
}

impl From<ExtractError> for CrateError {
    fn from(err: ExtractError) -> Self {
        CrateError::Extract(err.to_string())
    }
}

impl From<StrategyError> for CrateError {
    fn from(err: StrategyError) -> Self {
        CrateError::Extract(err.to_string())
    }
}
