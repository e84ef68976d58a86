//! Composite quality scoring for crawl results
//!
//! Scoring is a pure function of the normalized content and the extraction
//! counts, so re-running it on identical inputs always yields an identical
//! score. Weights are configuration and carry a version that is stored with
//! every score, keeping historical scores interpretable after weight
//! changes.

use serde::{Deserialize, Serialize};

use crate::normalizer::NormalizedContent;

/// Configurable weight set for the composite score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityWeights {
    /// Version stored alongside every score computed with this set
    pub version: u32,

    /// Weight of the saturating content-length score
    pub length: f32,

    /// Weight of entity mentions per 100 words
    pub entity_density: f32,

    /// Weight of relationship triples per 100 words
    pub relationship_density: f32,

    /// Fixed increment when tables or enumerated data were detected
    pub structure_bonus: f32,

    /// Word count at which the length score saturates
    pub length_saturation_words: usize,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            version: 1,
            length: 0.3,
            entity_density: 0.3,
            relationship_density: 0.25,
            structure_bonus: 0.15,
            length_saturation_words: 800,
        }
    }
}

/// A computed quality score, tagged with the weight-set version
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityScore {
    /// Composite score in [0,1]
    pub value: f32,

    pub weights_version: u32,
}

/// Compute the composite quality score.
///
/// `len_score` saturates at the configured word threshold so very long pages
/// stop gaining; densities are counts per 100 words and zero for empty
/// content; the structure bonus applies once when the normalizer flagged
/// tables or enumerated data. The result is clamped to [0,1].
pub fn assess(
    content: &NormalizedContent,
    entity_count: usize,
    triple_count: usize,
    weights: &QualityWeights,
) -> QualityScore {
    let words = content.word_count;
    let saturation = weights.length_saturation_words.max(1);
    let len_score = (words as f32 / saturation as f32).min(1.0);

    let per_100_words = |count: usize| {
        if words == 0 {
            0.0
        } else {
            count as f32 * 100.0 / words as f32
        }
    };

    let structure = if content.has_tables || content.has_lists {
        weights.structure_bonus
    } else {
        0.0
    };

    let value = (weights.length * len_score
        + weights.entity_density * per_100_words(entity_count)
        + weights.relationship_density * per_100_words(triple_count)
        + structure)
        .clamp(0.0, 1.0);

    QualityScore {
        value,
        weights_version: weights.version,
    }
}
