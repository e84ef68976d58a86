//! Strategy descriptors and the strategy-invocation capability
//!
//! A strategy is a named, versioned unit that turns normalized content into
//! a structured record plus a confidence value. The core never interprets
//! the provider/model identifier; all provider-specific behavior lives
//! behind the `StrategyInvoker` capability.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::extractor::error::StrategyError;
use crate::extractor::{Entity, Triple};
use crate::normalizer::NormalizedContent;

/// Declared capability kind of a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Schema-driven structured extraction (model-backed)
    SchemaDriven,

    /// Rule-based selector extraction
    SelectorRules,
}

/// Type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    List,
}

/// One named, typed field of a strategy's target schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub field_type: FieldType,
}

/// Descriptor of an extraction strategy.
///
/// Immutable once referenced by a binding that has produced results;
/// strategies are versioned by id, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    /// Stable id; doubles as the version handle
    pub id: String,

    /// Ordered set of named, typed target fields
    pub schema: Vec<SchemaField>,

    /// Natural-language extraction intent passed to the provider
    pub intent: String,

    /// Opaque provider/model identifier, resolved by the capability
    pub provider_model: String,

    /// Declared capability kind
    pub kind: StrategyKind,
}

/// Structured record plus confidence produced by one strategy invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyOutput {
    /// Schema-field values keyed by field name
    pub fields: Map<String, Value>,

    /// Typed entities found in the content
    pub entities: Vec<Entity>,

    /// Relationship triples found in the content
    pub triples: Vec<Triple>,

    /// Overall confidence of this invocation, in [0,1]
    pub confidence: f32,
}

/// The strategy-invocation capability injected into the pipeline.
///
/// `invoke` may call out to a remote provider; the pipeline treats it as a
/// suspension point and bounds it with the unit deadline.
#[async_trait]
pub trait StrategyInvoker: Send + Sync {
    async fn invoke(
        &self,
        descriptor: &StrategyDescriptor,
        content: &NormalizedContent,
    ) -> Result<StrategyOutput, StrategyError>;
}
