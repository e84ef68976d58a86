//! Terminal unit outcomes for the pipeline

use thiserror::Error;

use crate::error::Error as CrateError;
use crate::fetch::FetchMetadata;
use crate::pipeline::events::Stage;

/// Terminal failure of one crawl unit.
///
/// Retryable fetch failures and scheduling deferrals are absorbed inside
/// the pipeline up to the unit's retry and deadline budgets; what surfaces
/// here is only what the caller must act on, with the failing stage and a
/// human-readable cause attached.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No binding matched the URL: a configuration gap, not a runtime fault
    #[error("Resolution failed for {url}: {cause}")]
    Resolution { url: String, cause: String },

    /// The fetch failed terminally or exhausted its retry budget
    #[error("Fetch failed for {source_id}: {cause}")]
    Fetch {
        source_id: String,
        cause: String,
        metadata: FetchMetadata,
    },

    /// Normalization rejected the fetched content
    #[error("Normalization failed for {source_id}: {cause}")]
    Normalize { source_id: String, cause: String },

    /// The unit's overall deadline elapsed at a suspension point
    #[error("Unit for {source_id} timed out while in {stage:?}")]
    Timeout { source_id: String, stage: Stage },

    /// The unit cannot run with the current configuration (unknown tier,
    /// no usable strategies after fallback)
    #[error("Configuration error for {source_id}: {cause}")]
    Config { source_id: String, cause: String },
}

impl PipelineError {
    /// Stage the unit was in when it became terminal
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Resolution { .. } => Stage::Resolve,
            PipelineError::Fetch { .. } => Stage::Fetch,
            PipelineError::Normalize { .. } => Stage::Normalize,
            PipelineError::Timeout { stage, .. } => *stage,
            PipelineError::Config { .. } => Stage::Resolve,
        }
    }
}

impl From<PipelineError> for CrateError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Resolution { url, .. } => CrateError::Resolution(url),
            _ => CrateError::Pipeline(err.to_string()),
        }
    }
}
