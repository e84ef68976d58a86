//! # Crawl Pipeline Module
//!
//! This module drives a single crawl unit through the full cycle:
//! resolution, scheduling, fetching, normalization, extraction, scoring,
//! and persona routing. Units are independent tasks; many can run
//! concurrently, bounded only by the scheduler's token buckets and
//! in-flight cap.
//!
//! ## Key Components
//!
//! - `Pipeline`: wires the resolver, scheduler, fetch executor, and
//!   extractor together with a configuration
//! - `CrawlResult`: the completed, quality-scored unit of output
//! - `UnitEvent`: per-unit lifecycle events for observability consumers
//! - `PipelineError`: terminal unit outcomes with stage and cause
//!
//! ## Unit lifecycle
//!
//! Resolved -> Scheduled -> Fetching -> Fetched -> Normalized ->
//! Extracting -> Scored -> Routed, with three kinds of excursions: a
//! retryable fetch failure re-enters scheduling after backoff, a scheduling
//! deferral retries transparently until the unit deadline, and a deadline
//! expiry at any suspension point ends the unit without emitting a partial
//! result. Stages within a unit are strictly sequential; only strategy
//! invocations inside the extraction stage run concurrently.

mod error;
mod events;

pub use error::PipelineError;
pub use events::{Stage, UnitEvent};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::catalog::{Resolution, SourceResolver};
use crate::extractor::{Entity, Extractor, StrategyFailure, Triple};
use crate::fetch::{FetchExecutor, FetchMetadata, FetchOptions};
use crate::normalizer::{normalize, NormalizedContent};
use crate::quality::{self, QualityScore, QualityWeights};
use crate::router::{self, PersonaAssignment};
use crate::scheduler::{ScheduleError, Scheduler};

/// Upper bound on one scheduler wait before re-checking the unit deadline
const ACQUIRE_SLICE: Duration = Duration::from_secs(5);

/// The completed output of one crawl unit.
///
/// A crawl result exists only once the whole pipeline has completed for the
/// unit; timed-out and failed units emit no partial result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    /// Id of the source the unit belongs to
    pub source_id: String,

    /// Canonical content the extraction ran over
    pub content: NormalizedContent,

    /// Merged schema-field record from all successful strategies
    pub record: Map<String, Value>,

    pub entities: Vec<Entity>,
    pub triples: Vec<Triple>,

    /// Transport details, attached whether or not retries were needed
    pub fetch: FetchMetadata,

    /// Composite quality score, tagged with the weight-set version
    pub quality: QualityScore,

    /// True when at least one strategy failed; partial results must not be
    /// treated as complete
    pub partial: bool,

    /// Strategies that failed during extraction
    pub failed_strategies: Vec<StrategyFailure>,

    pub created_at: DateTime<Utc>,
}

/// A crawl result together with the personas it was routed to
#[derive(Debug, Clone)]
pub struct RoutedResult {
    pub result: CrawlResult,
    pub assignments: Vec<PersonaAssignment>,
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Overall deadline for one crawl unit, set at resolution time
    pub unit_deadline: Duration,

    /// Minimum persona relevance for routing
    pub min_relevance: f32,

    /// Quality weight set
    pub weights: QualityWeights,

    /// Fetch options applied per attempt
    pub fetch: FetchOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            unit_deadline: Duration::from_secs(120),
            min_relevance: 0.5,
            weights: QualityWeights::default(),
            fetch: FetchOptions::default(),
        }
    }
}

/// Builder for PipelineConfig
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-unit deadline
    pub fn unit_deadline(mut self, deadline: Duration) -> Self {
        self.config.unit_deadline = deadline;
        self
    }

    /// Set the persona routing threshold
    pub fn min_relevance(mut self, min_relevance: f32) -> Self {
        self.config.min_relevance = min_relevance;
        self
    }

    /// Set the quality weight set
    pub fn weights(mut self, weights: QualityWeights) -> Self {
        self.config.weights = weights;
        self
    }

    /// Set the fetch options
    pub fn fetch_options(mut self, fetch: FetchOptions) -> Self {
        self.config.fetch = fetch;
        self
    }

    /// Build the configuration
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

impl PipelineConfig {
    /// Create a new builder
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

/// Drives crawl units through the pipeline.
///
/// The pipeline holds read-only catalog and strategy snapshots; the only
/// mutable shared state is inside the scheduler.
pub struct Pipeline {
    resolver: SourceResolver,
    scheduler: Arc<Scheduler>,
    executor: FetchExecutor,
    extractor: Extractor,
    config: PipelineConfig,
    events: Option<UnboundedSender<UnitEvent>>,
}

impl Pipeline {
    pub fn new(
        resolver: SourceResolver,
        scheduler: Arc<Scheduler>,
        executor: FetchExecutor,
        extractor: Extractor,
        config: PipelineConfig,
    ) -> Self {
        Self {
            resolver,
            scheduler,
            executor,
            extractor,
            config,
            events: None,
        }
    }

    /// Send lifecycle events to `sender` in addition to tracing
    pub fn with_events(mut self, sender: UnboundedSender<UnitEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    fn emit(&self, event: UnitEvent) {
        debug!(event = ?event, "unit event");
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }

    /// Crawl a source's primary URL
    pub async fn crawl_source(&self, source_id: &str) -> Result<RoutedResult, PipelineError> {
        let Some(source) = self.resolver.source(source_id) else {
            return Err(PipelineError::Config {
                source_id: source_id.to_string(),
                cause: "unknown source".to_string(),
            });
        };
        let url = source.url.clone();
        self.crawl_url(&url).await
    }

    /// Run one crawl unit for `url` through the full pipeline.
    #[instrument(skip(self))]
    pub async fn crawl_url(&self, url: &str) -> Result<RoutedResult, PipelineError> {
        let deadline = Instant::now() + self.config.unit_deadline;

        // Resolution. Failure here is a configuration gap, reported as its
        // own outcome rather than a fetch or extraction fault.
        let Resolution { primary, candidates } = match self.resolver.resolve(url) {
            Ok(resolution) => resolution,
            Err(e) => {
                self.emit(UnitEvent::ResolutionFailed {
                    url: url.to_string(),
                    cause: e.to_string(),
                });
                return Err(PipelineError::Resolution {
                    url: url.to_string(),
                    cause: e.to_string(),
                });
            }
        };

        // Strategy validation, with fallback to the next candidate at most
        // once per unit.
        let mut binding = primary;
        if self.extractor.known_strategies(&binding.strategy_ids).is_empty() {
            match candidates.into_iter().next() {
                Some(next)
                    if !self.extractor.known_strategies(&next.strategy_ids).is_empty() =>
                {
                    self.emit(UnitEvent::FallbackBinding {
                        from: binding.id.clone(),
                        to: next.id.clone(),
                    });
                    binding = next;
                }
                _ => {
                    return Err(PipelineError::Config {
                        source_id: binding.source_id.clone(),
                        cause: format!("no usable strategies on binding {}", binding.id),
                    });
                }
            }
        }
        self.emit(UnitEvent::Resolved {
            url: url.to_string(),
            binding_id: binding.id.clone(),
        });

        let source = self
            .resolver
            .source(&binding.source_id)
            .cloned()
            .ok_or_else(|| PipelineError::Config {
                source_id: binding.source_id.clone(),
                cause: "binding references an unknown source".to_string(),
            })?;

        // Scheduling and fetching. Each attempt takes a fresh permit, so a
        // retrying unit competes for budget like any other.
        let mut attempts = 0u32;
        let mut total_latency = Duration::ZERO;

        let response = loop {
            attempts += 1;
            self.emit(UnitEvent::Scheduled {
                tier: source.tier,
                attempt: attempts,
            });

            let permit = loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    self.emit(UnitEvent::TimedOut {
                        stage: Stage::Schedule,
                    });
                    return Err(PipelineError::Timeout {
                        source_id: source.id.clone(),
                        stage: Stage::Schedule,
                    });
                }
                match self
                    .scheduler
                    .acquire_within(source.tier, ACQUIRE_SLICE.min(remaining))
                    .await
                {
                    Ok(permit) => break permit,
                    Err(ScheduleError::Deferred { tier, waited }) => {
                        self.emit(UnitEvent::Deferred { tier, waited });
                    }
                    Err(e) => {
                        return Err(PipelineError::Config {
                            source_id: source.id.clone(),
                            cause: e.to_string(),
                        });
                    }
                }
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.emit(UnitEvent::TimedOut { stage: Stage::Fetch });
                return Err(PipelineError::Timeout {
                    source_id: source.id.clone(),
                    stage: Stage::Fetch,
                });
            }
            self.emit(UnitEvent::Fetching { attempt: attempts });

            let options = FetchOptions {
                timeout: self.config.fetch.timeout.min(remaining),
                user_agent: self.config.fetch.user_agent.clone(),
            };
            let attempt_started = Instant::now();
            let result = self.executor.attempt(url, &options).await;
            total_latency += attempt_started.elapsed();
            drop(permit);

            match result {
                Ok(response) => break response,
                Err(e) if e.is_retryable() && attempts < binding.retry.max_attempts => {
                    let delay = FetchExecutor::backoff_delay(&binding.retry, attempts);
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if delay >= remaining {
                        self.emit(UnitEvent::TimedOut { stage: Stage::Fetch });
                        return Err(PipelineError::Timeout {
                            source_id: source.id.clone(),
                            stage: Stage::Fetch,
                        });
                    }
                    self.emit(UnitEvent::FetchFailed {
                        attempt: attempts,
                        cause: e.to_string(),
                        retry_in: Some(delay),
                    });
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.emit(UnitEvent::FetchFailed {
                        attempt: attempts,
                        cause: e.to_string(),
                        retry_in: None,
                    });
                    return Err(PipelineError::Fetch {
                        source_id: source.id.clone(),
                        cause: e.to_string(),
                        metadata: FetchMetadata {
                            status: e.status(),
                            latency: total_latency,
                            attempts,
                            error: Some(e.to_string()),
                        },
                    });
                }
            }
        };

        let metadata = FetchMetadata {
            status: Some(response.status),
            latency: total_latency,
            attempts,
            error: None,
        };
        self.emit(UnitEvent::Fetched {
            status: response.status,
            latency: response.elapsed,
        });

        // Normalization is synchronous and never suspends.
        let content =
            normalize(url, &response.body).map_err(|e| PipelineError::Normalize {
                source_id: source.id.clone(),
                cause: e.to_string(),
            })?;
        self.emit(UnitEvent::Normalized {
            words: content.word_count,
        });

        // Extraction: all strategies settle (or fail) before scoring. The
        // deadline bounds the whole stage; dropping the future on expiry
        // requests cancellation of still-pending invocations.
        let remaining = deadline.saturating_duration_since(Instant::now());
        let extraction = self.extractor.extract(&binding.strategy_ids, &content);
        let outcome = match tokio::time::timeout(remaining, extraction).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                return Err(PipelineError::Config {
                    source_id: source.id.clone(),
                    cause: e.to_string(),
                });
            }
            Err(_) => {
                self.emit(UnitEvent::TimedOut {
                    stage: Stage::Extract,
                });
                return Err(PipelineError::Timeout {
                    source_id: source.id.clone(),
                    stage: Stage::Extract,
                });
            }
        };
        for failure in &outcome.failed {
            self.emit(UnitEvent::StrategyFailed {
                strategy_id: failure.strategy_id.clone(),
                cause: failure.error.clone(),
            });
        }
        self.emit(UnitEvent::Extracted {
            entities: outcome.entities.len(),
            triples: outcome.triples.len(),
            partial: outcome.partial,
        });

        // Scoring and routing are pure and synchronous.
        let quality = quality::assess(
            &content,
            outcome.entities.len(),
            outcome.triples.len(),
            &self.config.weights,
        );
        self.emit(UnitEvent::Scored {
            value: quality.value,
        });

        let assignments = router::route(&source, self.config.min_relevance);
        self.emit(UnitEvent::Routed {
            personas: assignments.len(),
        });

        info!(
            source = %source.id,
            quality = quality.value,
            partial = outcome.partial,
            personas = assignments.len(),
            "crawl unit completed"
        );

        let result = CrawlResult {
            source_id: source.id.clone(),
            content,
            record: outcome.record,
            entities: outcome.entities,
            triples: outcome.triples,
            fetch: metadata,
            quality,
            partial: outcome.partial,
            failed_strategies: outcome.failed,
            created_at: Utc::now(),
        };

        Ok(RoutedResult {
            result,
            assignments,
        })
    }
}
