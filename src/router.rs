//! Persona routing for completed crawl results
//!
//! Routing is a pure filter over the source's persona-relevance map: it
//! never mutates the crawl result, and the same source and threshold always
//! produce the same assignment list.

use serde::{Deserialize, Serialize};

use crate::catalog::Source;

/// One persona a crawl result was routed to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaAssignment {
    pub persona_id: String,

    /// The source's relevance entry for the persona
    pub relevance: f32,
}

/// Route against `source`'s persona-relevance map: every persona whose
/// relevance meets `min_relevance` receives the result. One result can
/// serve many personas, and a persona receives many results over time.
///
/// Assignments are ordered by relevance descending, then persona id, so
/// downstream delivery is deterministic.
pub fn route(source: &Source, min_relevance: f32) -> Vec<PersonaAssignment> {
    let mut assignments: Vec<PersonaAssignment> = source
        .persona_relevance
        .iter()
        .filter(|(_, relevance)| **relevance >= min_relevance)
        .map(|(persona_id, relevance)| PersonaAssignment {
            persona_id: persona_id.clone(),
            relevance: *relevance,
        })
        .collect();

    assignments.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.persona_id.cmp(&b.persona_id))
    });

    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ScrapingDifficulty, SourcePriority, Tier};
    use std::collections::HashMap;
    use std::time::Duration;

    fn source_with_personas(entries: &[(&str, f32)]) -> Source {
        Source {
            id: "s1".to_string(),
            name: "Example".to_string(),
            url: "https://example.com".to_string(),
            feed_url: None,
            tier: Tier(1),
            priority: SourcePriority::High,
            crawl_interval: Duration::from_secs(900),
            focus_tags: Vec::new(),
            persona_relevance: entries
                .iter()
                .map(|(id, r)| (id.to_string(), *r))
                .collect::<HashMap<_, _>>(),
            scraping_difficulty: ScrapingDifficulty::Easy,
            cost_tier: 1,
        }
    }

    #[test]
    fn personas_below_the_threshold_are_filtered_out() {
        let source = source_with_personas(&[("trader", 0.9), ("analyst", 0.4), ("casual", 0.1)]);

        let assignments = route(&source, 0.5);

        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].persona_id, "trader");
    }

    #[test]
    fn threshold_is_inclusive() {
        let source = source_with_personas(&[("analyst", 0.5)]);
        assert_eq!(route(&source, 0.5).len(), 1);
    }

    #[test]
    fn one_result_can_serve_many_personas() {
        let source = source_with_personas(&[("trader", 0.9), ("analyst", 0.8)]);
        assert_eq!(route(&source, 0.5).len(), 2);
    }

    #[test]
    fn assignments_are_deterministically_ordered() {
        let source =
            source_with_personas(&[("b-persona", 0.7), ("a-persona", 0.7), ("trader", 0.9)]);

        let assignments = route(&source, 0.0);
        let ids: Vec<&str> = assignments.iter().map(|a| a.persona_id.as_str()).collect();

        assert_eq!(ids, vec!["trader", "a-persona", "b-persona"]);
    }

    #[test]
    fn routing_does_not_touch_the_source() {
        let source = source_with_personas(&[("trader", 0.9)]);
        let before = source.persona_relevance.clone();

        let _ = route(&source, 0.5);

        assert_eq!(source.persona_relevance, before);
    }
}
