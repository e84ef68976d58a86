//! # Entity/Relationship Extractor Module
//!
//! This module runs extraction strategies over normalized content and turns
//! their outputs into typed entities and relationship triples. Strategy
//! invocation is an injected capability; the module owns strategy lookup,
//! concurrent invocation, partial-failure accounting, and merging.
//!
//! ## Key Components
//!
//! - `Entity` / `Triple`: the typed extraction outputs
//! - `StrategyDescriptor` / `StrategyInvoker`: the capability surface
//! - `Extractor`: runs a binding's strategies and merges their outputs
//! - `ExtractionOutcome`: merged record plus per-strategy failures
//!
//! ## Features
//!
//! - Strategies on one binding run concurrently and all settle before the
//!   unit moves on to scoring
//! - A failing strategy degrades the unit to a partial result instead of
//!   failing it
//! - Conflicting outputs merge by confidence with a retrievable audit trail

mod error;
mod merge;
pub mod mock;
mod strategy;

pub use error::{ExtractError, StrategyError};
pub use merge::DISCARDED_KEY;
pub use strategy::{
    FieldType, SchemaField, StrategyDescriptor, StrategyInvoker, StrategyKind, StrategyOutput,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::normalizer::NormalizedContent;

/// Type of an extracted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Token,
    Exchange,
    Protocol,
    Address,
    Other,
}

/// An extracted typed object.
///
/// Entities are produced only by extraction and never mutated afterwards;
/// corrections are new entities with provenance back to the producing
/// result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub entity_type: EntityType,
    pub symbol: Option<String>,
    pub address: Option<String>,
    pub network: Option<String>,

    /// Confidence in [0,1]
    pub confidence: f32,

    /// Snippet of the content the entity was found in
    pub context: String,

    /// Free-form property bag; `discarded_alternatives` is reserved for
    /// merge audit entries
    pub properties: Map<String, Value>,
}

/// Controlled predicate vocabulary for relationship triples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    TradesOn,
    MeasuredBy,
    ComparesWith,
    IssuedBy,
    PartOf,
}

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::TradesOn => "trades_on",
            Predicate::MeasuredBy => "measured_by",
            Predicate::ComparesWith => "compares_with",
            Predicate::IssuedBy => "issued_by",
            Predicate::PartOf => "part_of",
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An extracted subject-predicate-object relationship. Immutable, like
/// `Entity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: String,
    pub predicate: Predicate,
    pub object: String,

    /// Confidence in [0,1]
    pub confidence: f32,

    /// Id of the source the relationship was extracted from
    pub source_id: String,

    pub timestamp: DateTime<Utc>,
}

/// One strategy that failed during extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyFailure {
    pub strategy_id: String,
    pub error: String,
}

/// Merged result of running a binding's strategies over one unit's content
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    /// Merged schema-field record, including any `discarded_alternatives`
    pub record: Map<String, Value>,

    pub entities: Vec<Entity>,
    pub triples: Vec<Triple>,

    /// Strategies that failed at the capability level
    pub failed: Vec<StrategyFailure>,

    /// True when at least one strategy failed; consumers must not treat a
    /// partial result as complete
    pub partial: bool,
}

/// Runs extraction strategies through the injected capability and merges
/// their outputs.
#[derive(Clone)]
pub struct Extractor {
    invoker: Arc<dyn StrategyInvoker>,
    strategies: HashMap<String, StrategyDescriptor>,
}

impl Extractor {
    /// Create an extractor over a registry of strategy descriptors
    pub fn new(invoker: Arc<dyn StrategyInvoker>, strategies: Vec<StrategyDescriptor>) -> Self {
        let strategies = strategies.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self { invoker, strategies }
    }

    /// Look up a descriptor by id
    pub fn descriptor(&self, id: &str) -> Option<&StrategyDescriptor> {
        self.strategies.get(id)
    }

    /// Descriptors for the subset of `ids` the registry knows
    pub fn known_strategies(&self, ids: &[String]) -> Vec<&StrategyDescriptor> {
        ids.iter()
            .filter_map(|id| self.strategies.get(id))
            .collect()
    }

    /// Run every known strategy among `strategy_ids` over `content`,
    /// concurrently, and merge the successful outputs.
    ///
    /// Errs only when none of the ids resolve to a known descriptor, which
    /// the pipeline treats as failed validation of the binding. Individual
    /// strategy failures degrade the outcome to partial instead.
    #[instrument(skip(self, content), fields(strategies = strategy_ids.len()))]
    pub async fn extract(
        &self,
        strategy_ids: &[String],
        content: &NormalizedContent,
    ) -> Result<ExtractionOutcome, ExtractError> {
        let descriptors = self.known_strategies(strategy_ids);
        if descriptors.is_empty() {
            return Err(ExtractError::NoUsableStrategies {
                requested: strategy_ids.to_vec(),
            });
        }
        if descriptors.len() < strategy_ids.len() {
            warn!(
                requested = strategy_ids.len(),
                known = descriptors.len(),
                "some strategy ids are unknown and will be skipped"
            );
        }

        let invocations = descriptors.into_iter().map(|descriptor| {
            let invoker = self.invoker.clone();
            async move {
                let result = invoker.invoke(descriptor, content).await;
                (descriptor.id.clone(), result)
            }
        });
        let settled = futures::future::join_all(invocations).await;

        let mut successes = Vec::new();
        let mut failed = Vec::new();
        for (strategy_id, result) in settled {
            match result {
                Ok(output) => successes.push((strategy_id, output)),
                Err(e) => {
                    warn!(strategy = %strategy_id, error = %e, "strategy invocation failed");
                    failed.push(StrategyFailure {
                        strategy_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let merged = merge::merge_outputs(successes);
        let partial = !failed.is_empty();

        debug!(
            entities = merged.entities.len(),
            triples = merged.triples.len(),
            failed = failed.len(),
            "extraction finished"
        );

        Ok(ExtractionOutcome {
            record: merged.fields,
            entities: merged.entities,
            triples: merged.triples,
            failed,
            partial,
        })
    }
}
