//! # Prospector - Source Resolution and Extraction Pipeline for Rust
//!
//! This crate ingests content from many web and feed sources, resolves each
//! URL to one or more structured-extraction strategies, executes the
//! fetch-and-extract cycle under per-tier rate and concurrency limits, and
//! produces quality-scored structured records routed to downstream
//! personas.
//!
//! ## Features
//!
//! - Deterministic URL pattern matching (exact, domain, path-prefix, regex)
//!   with configurable binding tie-breaking
//! - Per-tier token-bucket scheduling with a global in-flight cap
//! - Fetching through an injected capability, with retry, exponential
//!   backoff, and retryable/terminal failure classification
//! - Pure, deterministic content normalization with link and media
//!   side-lists
//! - Concurrent strategy invocation with confidence-based merging and a
//!   retrievable audit trail
//! - Versioned composite quality scoring
//! - Persona routing against per-source relevance maps
//! - Async API with Tokio
//! - Robust error handling and logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use prospector::catalog::{Binding, SourceResolver};
//! use prospector::extractor::Extractor;
//! use prospector::fetch::{FetchExecutor, HttpFetcher};
//! use prospector::pipeline::{Pipeline, PipelineConfig};
//! use prospector::scheduler::{Scheduler, SchedulerConfig};
//!
//! # async fn run(
//! #     sources: Vec<prospector::catalog::Source>,
//! #     bindings: Vec<Binding>,
//! #     strategies: Vec<prospector::extractor::StrategyDescriptor>,
//! #     tiers: Vec<prospector::scheduler::TierConfig>,
//! #     invoker: Arc<dyn prospector::extractor::StrategyInvoker>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(
//!     SourceResolver::new(sources, bindings),
//!     Arc::new(Scheduler::new(tiers, SchedulerConfig::default())),
//!     FetchExecutor::new(Arc::new(HttpFetcher::new())),
//!     Extractor::new(invoker, strategies),
//!     PipelineConfig::default(),
//! );
//!
//! let routed = pipeline.crawl_url("https://example.com/news/btc").await?;
//! println!("quality {}", routed.result.quality.value);
//! # Ok(())
//! # }
//! ```

mod error;
pub mod telemetry;

// Pipeline stage modules
pub mod catalog;
pub mod extractor;
pub mod fetch;
pub mod normalizer;
pub mod pipeline;
pub mod quality;
pub mod router;
pub mod scheduler;

pub use error::Error;

/// Re-export of the common surface for public use
pub mod prelude {
    pub use crate::catalog::{Binding, MatchRule, Source, SourceResolver, TieBreak, Tier};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::extractor::{
        Entity, EntityType, Extractor, Predicate, StrategyDescriptor, StrategyInvoker, Triple,
    };
    pub use crate::fetch::{FetchExecutor, Fetcher, HttpFetcher};
    pub use crate::pipeline::{CrawlResult, Pipeline, PipelineConfig, RoutedResult, UnitEvent};
    pub use crate::quality::QualityWeights;
    pub use crate::router::PersonaAssignment;
    pub use crate::scheduler::{Scheduler, SchedulerConfig, TierConfig};
}
