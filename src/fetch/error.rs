//! Error types for the fetch module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    /// The attempt exceeded its timeout budget
    #[error("Fetch timed out")]
    Timeout,

    /// Connection-level failure (refused, reset, DNS)
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server answered with a non-success status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The URL could not be parsed at all
    #[error("Malformed URL: {0}")]
    MalformedUrl(#[from] url::ParseError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// Whether the failure is worth retrying. Timeouts, connection faults,
    /// 5xx and 429 are transient; other 4xx and malformed URLs are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Connection(_) => true,
            FetchError::Status(code) => *code >= 500 || *code == 429,
            FetchError::MalformedUrl(_) | FetchError::Other(_) => false,
        }
    }

    /// Status code carried by the error, when one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::MalformedUrl(e) => CrateError::UrlParse(e),
            _ => CrateError::Fetch(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_follows_the_retry_table() {
        assert!(FetchError::Timeout.is_retryable());
        assert!(FetchError::Connection("reset".into()).is_retryable());
        assert!(FetchError::Status(503).is_retryable());
        assert!(FetchError::Status(429).is_retryable());

        assert!(!FetchError::Status(404).is_retryable());
        assert!(!FetchError::Status(403).is_retryable());
        assert!(!FetchError::Other("boom".into()).is_retryable());
    }
}
