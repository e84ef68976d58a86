//! # Source Catalog Module
//!
//! This module holds the configuration surface the pipeline reads from: the
//! catalog of sources to crawl and the bindings that map URL patterns to
//! extraction strategies. The pipeline only ever reads a snapshot of this
//! data; creating and editing catalog records is an external concern.
//!
//! ## Key Components
//!
//! - `Source`: a catalog entry for one origin (site or feed) with tier,
//!   priority, and persona-relevance weighting
//! - `Binding`: a rule associating a URL pattern with strategy ids and
//!   execution settings (priority, rate limit, retry policy)
//! - `MatchRule`: exact / domain / path-prefix / regex URL matching
//! - `SourceResolver`: turns a URL into an execution plan using the
//!   configured tie-break order
//!
//! ## Features
//!
//! - Deterministic, side-effect-free pattern matching
//! - Configurable binding tie-break order (priority-first by default)
//! - Snapshot-copied inherited metadata with explicit re-resolution

mod error;
mod pattern;
mod resolver;

pub use error::CatalogError;
pub use pattern::{match_rules, normalized_url_str, MatchKind, MatchRule, RuleMatch, Specificity};
pub use resolver::{Resolution, SourceResolver, TieBreak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Rate-limiting and priority grouping for sources. Lower numbers are
/// higher-ranked tiers (tier 1 outranks tier 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tier(pub u8);

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tier-{}", self.0)
    }
}

/// Crawl priority of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePriority {
    High,
    Medium,
    Low,
}

/// How hard a source is to scrape, copied into bindings as inherited metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapingDifficulty {
    Easy,
    Moderate,
    Hard,
}

/// A catalog entry representing one origin to crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Primary URL of the source
    pub url: String,

    /// Optional feed URL (RSS/Atom)
    pub feed_url: Option<String>,

    /// Rate-limiting tier the source belongs to
    pub tier: Tier,

    /// Crawl priority
    pub priority: SourcePriority,

    /// How often the source should be crawled
    pub crawl_interval: Duration,

    /// Extraction-focus tags (e.g. "defi", "exchanges")
    pub focus_tags: Vec<String>,

    /// Persona id -> relevance in [0,1]
    pub persona_relevance: HashMap<String, f32>,

    /// Scraping difficulty, inherited by bindings at creation time
    pub scraping_difficulty: ScrapingDifficulty,

    /// Cost tier, inherited by bindings at creation time
    pub cost_tier: u8,
}

/// Retry policy applied by the fetch executor
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of fetch attempts (including the first)
    pub max_attempts: u32,

    /// Base delay for exponential backoff
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Source metadata copied into a binding when the binding is created.
///
/// This is a one-time snapshot, not a live reference: editing the owning
/// `Source` afterwards does not change the binding until `Binding::re_resolve`
/// is called explicitly. `copied_at` records when the snapshot was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InheritedMeta {
    pub scraping_difficulty: ScrapingDifficulty,
    pub cost_tier: u8,
    pub copied_at: DateTime<Utc>,
}

impl InheritedMeta {
    fn snapshot(source: &Source) -> Self {
        Self {
            scraping_difficulty: source.scraping_difficulty,
            cost_tier: source.cost_tier,
            copied_at: Utc::now(),
        }
    }
}

/// A rule associating a URL pattern with extraction strategies and
/// execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    /// Stable identifier
    pub id: String,

    /// Id of the owning source
    pub source_id: String,

    /// URL match rule
    pub rule: MatchRule,

    /// Ordered list of strategy ids to run against matched content
    pub strategy_ids: Vec<String>,

    /// Binding priority; higher wins during resolution
    pub priority: i32,

    /// Requests per minute allowed for this binding's URLs
    pub rate_limit_per_min: u32,

    /// Retry policy for fetches under this binding
    pub retry: RetryPolicy,

    /// Metadata snapshot copied from the owning source
    pub inherited: InheritedMeta,

    /// Last time the binding was updated; used as the final tie-breaker
    pub updated_at: DateTime<Utc>,
}

impl Binding {
    /// Create a binding owned by `source`, snapshotting its inherited metadata
    pub fn new(
        id: impl Into<String>,
        source: &Source,
        rule: MatchRule,
        strategy_ids: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_id: source.id.clone(),
            rule,
            strategy_ids,
            priority: 0,
            rate_limit_per_min: 60,
            retry: RetryPolicy::default(),
            inherited: InheritedMeta::snapshot(source),
            updated_at: Utc::now(),
        }
    }

    /// Set the binding priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the per-minute rate limit
    pub fn with_rate_limit(mut self, per_min: u32) -> Self {
        self.rate_limit_per_min = per_min;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the last-updated timestamp (fixtures and imports)
    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }

    /// Refresh the inherited metadata snapshot from `source`.
    ///
    /// Returns an error when `source` is not the owning source; inheritance
    /// never crosses sources silently.
    pub fn re_resolve(&mut self, source: &Source) -> Result<(), CatalogError> {
        if source.id != self.source_id {
            return Err(CatalogError::ForeignSource {
                binding_id: self.id.clone(),
                source_id: source.id.clone(),
            });
        }
        self.inherited = InheritedMeta::snapshot(source);
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_source(id: &str) -> Source {
        Source {
            id: id.to_string(),
            name: format!("{id} source"),
            url: format!("https://{id}.example.com"),
            feed_url: None,
            tier: Tier(1),
            priority: SourcePriority::Medium,
            crawl_interval: Duration::from_secs(3600),
            focus_tags: vec!["defi".into()],
            persona_relevance: HashMap::new(),
            scraping_difficulty: ScrapingDifficulty::Easy,
            cost_tier: 1,
        }
    }

    #[test]
    fn inherited_meta_is_a_snapshot() {
        let mut source = test_source("coindesk");
        let binding = Binding::new(
            "b1",
            &source,
            MatchRule::domain("example.com"),
            vec!["s1".into()],
        );

        source.scraping_difficulty = ScrapingDifficulty::Hard;
        source.cost_tier = 3;

        assert_eq!(
            binding.inherited.scraping_difficulty,
            ScrapingDifficulty::Easy
        );
        assert_eq!(binding.inherited.cost_tier, 1);
    }

    #[test]
    fn re_resolve_refreshes_the_snapshot() {
        let mut source = test_source("coindesk");
        let mut binding = Binding::new(
            "b1",
            &source,
            MatchRule::domain("example.com"),
            vec!["s1".into()],
        );

        source.cost_tier = 3;
        binding.re_resolve(&source).unwrap();
        assert_eq!(binding.inherited.cost_tier, 3);
    }

    #[test]
    fn re_resolve_rejects_a_foreign_source() {
        let source = test_source("coindesk");
        let other = test_source("theblock");
        let mut binding = Binding::new(
            "b1",
            &source,
            MatchRule::domain("example.com"),
            vec!["s1".into()],
        );

        assert!(matches!(
            binding.re_resolve(&other),
            Err(CatalogError::ForeignSource { .. })
        ));
    }
}
