//! Error types for the catalog module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A match rule carries a pattern that cannot be evaluated
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A binding references a source the resolver does not know
    #[error("Unknown source '{0}'")]
    UnknownSource(String),

    /// No binding matched the URL; a configuration gap, not a runtime fault
    #[error("No binding matches '{0}'")]
    NoMatch(String),

    /// A binding was asked to inherit from a source that does not own it
    #[error("Binding '{binding_id}' is not owned by source '{source_id}'")]
    ForeignSource { binding_id: String, source_id: String },
}

impl From<CatalogError> for CrateError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NoMatch(url) => CrateError::Resolution(url),
            CatalogError::InvalidUrl(e) => CrateError::UrlParse(e),
            _ => CrateError::Catalog(err.to_string()),
        }
    }
}
