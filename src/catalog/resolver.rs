//! Source resolution: ordering matched bindings into an execution plan

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::catalog::error::CatalogError;
use crate::catalog::pattern::Specificity;
use crate::catalog::{Binding, Source};

/// Tie-break order applied when several bindings match a URL.
///
/// Upstream documentation of systems like this one conflicts on whether
/// priority or specificity wins first, so the order is explicit
/// configuration here. Recency (binding `updated_at`) always breaks the
/// remaining ties, and binding id after that, so resolution is fully
/// deterministic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// priority desc, then specificity, then recency
    #[default]
    PriorityFirst,

    /// specificity, then priority desc, then recency
    SpecificityFirst,
}

/// The execution plan for a URL: the winning binding plus the remaining
/// candidates, used only when the primary's strategies all fail validation.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub primary: Binding,
    pub candidates: Vec<Binding>,
}

/// Resolves URLs against a read-only snapshot of the catalog.
///
/// The resolver owns its snapshot; configuration edits happen externally and
/// become visible by constructing a new resolver.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    sources: HashMap<String, Source>,
    bindings: Vec<Binding>,
    tie_break: TieBreak,
}

impl SourceResolver {
    /// Create a resolver over a snapshot of sources and bindings
    pub fn new(sources: Vec<Source>, bindings: Vec<Binding>) -> Self {
        let sources = sources.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self {
            sources,
            bindings,
            tie_break: TieBreak::default(),
        }
    }

    /// Set the tie-break order
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Look up a source by id
    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.get(id)
    }

    /// Resolve `url` to its primary binding and fallback candidates.
    ///
    /// `CatalogError::NoMatch` indicates a configuration gap and is distinct
    /// from fetch or extraction failures downstream.
    #[instrument(skip(self))]
    pub fn resolve(&self, url: &str) -> Result<Resolution, CatalogError> {
        let parsed = Url::parse(url)?;

        let mut matched: Vec<(&Binding, Specificity)> = Vec::new();
        for binding in &self.bindings {
            match binding.rule.matches(&parsed) {
                Ok(true) => matched.push((binding, binding.rule.specificity())),
                Ok(false) => {}
                Err(e) => {
                    warn!(binding = %binding.id, error = %e, "skipping binding with unevaluable rule");
                }
            }
        }

        if matched.is_empty() {
            return Err(CatalogError::NoMatch(url.to_string()));
        }

        let tie_break = self.tie_break;
        matched.sort_by(|(a, a_spec), (b, b_spec)| {
            let by_priority = b.priority.cmp(&a.priority);
            let by_specificity = b_spec.cmp(a_spec);
            let ordered = match tie_break {
                TieBreak::PriorityFirst => by_priority.then(by_specificity),
                TieBreak::SpecificityFirst => by_specificity.then(by_priority),
            };
            ordered
                .then(b.updated_at.cmp(&a.updated_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut bindings = matched.into_iter().map(|(b, _)| b.clone());
        let primary = bindings.next().ok_or_else(|| {
            // Unreachable: emptiness is checked above.
            CatalogError::NoMatch(url.to_string())
        })?;
        let candidates: Vec<Binding> = bindings.collect();

        debug!(
            primary = %primary.id,
            candidates = candidates.len(),
            "resolved {} to binding {}",
            url,
            primary.id
        );

        Ok(Resolution {
            primary,
            candidates,
        })
    }

    /// Verify the sources referenced by bindings all exist in the snapshot
    pub fn validate(&self) -> Result<(), CatalogError> {
        for binding in &self.bindings {
            if !self.sources.contains_key(&binding.source_id) {
                return Err(CatalogError::UnknownSource(binding.source_id.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MatchRule, ScrapingDifficulty, SourcePriority, Tier};
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn test_source(id: &str) -> Source {
        Source {
            id: id.to_string(),
            name: format!("{id} source"),
            url: format!("https://{id}.example.com"),
            feed_url: None,
            tier: Tier(1),
            priority: SourcePriority::Medium,
            crawl_interval: Duration::from_secs(3600),
            focus_tags: Vec::new(),
            persona_relevance: HashMap::new(),
            scraping_difficulty: ScrapingDifficulty::Easy,
            cost_tier: 1,
        }
    }

    fn binding(id: &str, source: &Source, rule: MatchRule, priority: i32) -> Binding {
        Binding::new(id, source, rule, vec!["s1".to_string()]).with_priority(priority)
    }

    #[test]
    fn priority_breaks_ties_first_by_default() {
        // One exact binding at priority 5 and one domain binding at priority
        // 10 both match; under the default order the higher priority wins
        // even though the exact rule is more specific.
        let source = test_source("coindesk");
        let exact = binding(
            "exact",
            &source,
            MatchRule::exact("https://example.com/news"),
            5,
        );
        let domain = binding("domain", &source, MatchRule::domain("example.com"), 10);

        let resolver = SourceResolver::new(vec![source], vec![exact, domain]);
        let resolution = resolver.resolve("https://example.com/news").unwrap();

        assert_eq!(resolution.primary.id, "domain");
        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].id, "exact");
    }

    #[test]
    fn specificity_first_prefers_the_exact_binding() {
        let source = test_source("coindesk");
        let exact = binding(
            "exact",
            &source,
            MatchRule::exact("https://example.com/news"),
            5,
        );
        let domain = binding("domain", &source, MatchRule::domain("example.com"), 10);

        let resolver = SourceResolver::new(vec![source], vec![exact, domain])
            .with_tie_break(TieBreak::SpecificityFirst);
        let resolution = resolver.resolve("https://example.com/news").unwrap();

        assert_eq!(resolution.primary.id, "exact");
    }

    #[test]
    fn specificity_breaks_equal_priorities() {
        let source = test_source("coindesk");
        let exact = binding(
            "exact",
            &source,
            MatchRule::exact("https://example.com/news"),
            5,
        );
        let domain = binding("domain", &source, MatchRule::domain("example.com"), 5);

        let resolver = SourceResolver::new(vec![source], vec![domain, exact]);
        let resolution = resolver.resolve("https://example.com/news").unwrap();

        assert_eq!(resolution.primary.id, "exact");
    }

    #[test]
    fn recency_breaks_remaining_ties() {
        let source = test_source("coindesk");
        let older = binding("older", &source, MatchRule::domain("example.com"), 5)
            .with_updated_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let newer = binding("newer", &source, MatchRule::domain("example.com"), 5)
            .with_updated_at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());

        let resolver = SourceResolver::new(vec![source], vec![older, newer]);
        let resolution = resolver.resolve("https://example.com/news").unwrap();

        assert_eq!(resolution.primary.id, "newer");
    }

    #[test]
    fn no_match_is_a_distinct_outcome() {
        let source = test_source("coindesk");
        let b = binding("b", &source, MatchRule::domain("elsewhere.com"), 5);

        let resolver = SourceResolver::new(vec![source], vec![b]);
        let err = resolver.resolve("https://example.com/news").unwrap_err();

        assert!(matches!(err, CatalogError::NoMatch(_)));
    }

    #[test]
    fn validate_reports_dangling_source_ids() {
        let source = test_source("coindesk");
        let mut b = binding("b", &source, MatchRule::domain("example.com"), 5);
        b.source_id = "missing".to_string();

        let resolver = SourceResolver::new(vec![source], vec![b]);
        assert!(matches!(
            resolver.validate(),
            Err(CatalogError::UnknownSource(_))
        ));
    }
}
