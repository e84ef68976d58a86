//! Field-by-field merging of strategy outputs
//!
//! Conflicts are resolved by confidence, and the losing value is always
//! recorded under the reserved `discarded_alternatives` key so the merge is
//! auditable. Silent overwrite is forbidden.

use serde_json::{json, Map, Value};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use crate::extractor::strategy::StrategyOutput;
use crate::extractor::{Entity, Triple};

/// Reserved key carrying discarded merge alternatives, both in the merged
/// record and in entity property bags. Strategy schemas must not use it as
/// a field name.
pub const DISCARDED_KEY: &str = "discarded_alternatives";

/// Result of merging all successful strategy outputs of one unit
#[derive(Debug, Default)]
pub(crate) struct MergedRecord {
    pub fields: Map<String, Value>,
    pub entities: Vec<Entity>,
    pub triples: Vec<Triple>,
}

struct FieldSlot {
    value: Value,
    confidence: f32,
    strategy_id: String,
}

fn discarded_entry(value: &Value, confidence: f32, strategy_id: &str) -> Value {
    json!({
        "value": value,
        "confidence": confidence,
        "strategy_id": strategy_id,
    })
}

/// Merge strategy outputs in invocation order.
///
/// - Record fields: the higher-confidence value wins; the loser is appended
///   to `discarded_alternatives` in the merged record. Identical values
///   merge without an audit entry.
/// - Entities: keyed by (lower-cased name, type); the higher-confidence
///   entity wins and the loser is recorded in the winner's property bag.
/// - Triples: keyed by (subject, predicate, object), case-insensitive on
///   subject and object; the higher confidence is kept.
///
/// On equal confidence the earlier output wins, which keeps the merge
/// deterministic in binding order.
pub(crate) fn merge_outputs(outputs: Vec<(String, StrategyOutput)>) -> MergedRecord {
    let mut fields: HashMap<String, FieldSlot> = HashMap::new();
    let mut field_order: Vec<String> = Vec::new();
    let mut discarded_fields: HashMap<String, Vec<Value>> = HashMap::new();

    let mut entities: Vec<Entity> = Vec::new();
    let mut entity_index: HashMap<(String, String), usize> = HashMap::new();

    let mut triples: Vec<Triple> = Vec::new();
    let mut triple_index: HashMap<(String, String, String), usize> = HashMap::new();

    for (strategy_id, output) in outputs {
        let confidence = output.confidence.clamp(0.0, 1.0);

        for (name, value) in output.fields {
            match fields.entry(name) {
                Entry::Vacant(slot) => {
                    field_order.push(slot.key().clone());
                    slot.insert(FieldSlot {
                        value,
                        confidence,
                        strategy_id: strategy_id.clone(),
                    });
                }
                Entry::Occupied(mut occupied) => {
                    let name = occupied.key().clone();
                    let slot = occupied.get_mut();
                    if slot.value == value {
                        // Agreement: keep the stronger claim, no audit entry.
                        if confidence > slot.confidence {
                            slot.confidence = confidence;
                            slot.strategy_id = strategy_id.clone();
                        }
                    } else if confidence > slot.confidence {
                        let loser =
                            discarded_entry(&slot.value, slot.confidence, &slot.strategy_id);
                        discarded_fields.entry(name).or_default().push(loser);
                        *slot = FieldSlot {
                            value,
                            confidence,
                            strategy_id: strategy_id.clone(),
                        };
                    } else {
                        let loser = discarded_entry(&value, confidence, &strategy_id);
                        discarded_fields.entry(name).or_default().push(loser);
                    }
                }
            }
        }

        for mut entity in output.entities {
            entity.confidence = entity.confidence.clamp(0.0, 1.0);
            let key = (
                entity.name.to_lowercase(),
                format!("{:?}", entity.entity_type),
            );
            match entity_index.get(&key) {
                None => {
                    entity_index.insert(key, entities.len());
                    entities.push(entity);
                }
                Some(&idx) => {
                    let incumbent = &mut entities[idx];
                    if entity.confidence > incumbent.confidence {
                        // Carry the incumbent's audit trail forward, then
                        // record the incumbent itself as discarded.
                        let mut trail = incumbent
                            .properties
                            .remove(DISCARDED_KEY)
                            .and_then(|v| v.as_array().cloned())
                            .unwrap_or_default();
                        trail.push(json!({
                            "name": incumbent.name,
                            "confidence": incumbent.confidence,
                        }));
                        entity
                            .properties
                            .insert(DISCARDED_KEY.to_string(), Value::Array(trail));
                        *incumbent = entity;
                    } else {
                        let trail = incumbent
                            .properties
                            .entry(DISCARDED_KEY.to_string())
                            .or_insert_with(|| Value::Array(Vec::new()));
                        if let Value::Array(items) = trail {
                            items.push(json!({
                                "name": entity.name,
                                "confidence": entity.confidence,
                            }));
                        }
                    }
                }
            }
        }

        for mut triple in output.triples {
            triple.confidence = triple.confidence.clamp(0.0, 1.0);
            let key = (
                triple.subject.to_lowercase(),
                triple.predicate.as_str().to_string(),
                triple.object.to_lowercase(),
            );
            match triple_index.get(&key) {
                None => {
                    triple_index.insert(key, triples.len());
                    triples.push(triple);
                }
                Some(&idx) => {
                    if triple.confidence > triples[idx].confidence {
                        triples[idx] = triple;
                    }
                }
            }
        }
    }

    let mut merged_fields = Map::new();
    for name in field_order {
        if let Some(slot) = fields.remove(&name) {
            merged_fields.insert(name, slot.value);
        }
    }
    if !discarded_fields.is_empty() {
        let mut audit = Map::new();
        let mut names: Vec<_> = discarded_fields.into_iter().collect();
        names.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (name, losers) in names {
            audit.insert(name, Value::Array(losers));
        }
        merged_fields.insert(DISCARDED_KEY.to_string(), Value::Object(audit));
    }

    MergedRecord {
        fields: merged_fields,
        entities,
        triples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::EntityType;
    use serde_json::json;

    fn output_with_field(field: &str, value: Value, confidence: f32) -> StrategyOutput {
        let mut fields = Map::new();
        fields.insert(field.to_string(), value);
        StrategyOutput {
            fields,
            confidence,
            ..StrategyOutput::default()
        }
    }

    fn entity(name: &str, confidence: f32) -> Entity {
        Entity {
            name: name.to_string(),
            entity_type: EntityType::Token,
            symbol: None,
            address: None,
            network: None,
            confidence,
            context: String::new(),
            properties: Map::new(),
        }
    }

    #[test]
    fn higher_confidence_field_wins_and_loser_is_auditable() {
        let merged = merge_outputs(vec![
            (
                "weak".to_string(),
                output_with_field("headline", json!("BTC dips"), 0.4),
            ),
            (
                "strong".to_string(),
                output_with_field("headline", json!("BTC climbs"), 0.9),
            ),
        ]);

        assert_eq!(merged.fields["headline"], json!("BTC climbs"));

        let audit = &merged.fields[DISCARDED_KEY]["headline"];
        assert_eq!(audit[0]["value"], json!("BTC dips"));
        assert_eq!(audit[0]["strategy_id"], json!("weak"));
    }

    #[test]
    fn winner_is_independent_of_invocation_order() {
        let forward = merge_outputs(vec![
            (
                "a".to_string(),
                output_with_field("headline", json!("low"), 0.3),
            ),
            (
                "b".to_string(),
                output_with_field("headline", json!("high"), 0.8),
            ),
        ]);
        let reverse = merge_outputs(vec![
            (
                "b".to_string(),
                output_with_field("headline", json!("high"), 0.8),
            ),
            (
                "a".to_string(),
                output_with_field("headline", json!("low"), 0.3),
            ),
        ]);

        assert_eq!(forward.fields["headline"], json!("high"));
        assert_eq!(reverse.fields["headline"], json!("high"));
    }

    #[test]
    fn agreeing_values_merge_without_an_audit_entry() {
        let merged = merge_outputs(vec![
            (
                "a".to_string(),
                output_with_field("symbol", json!("BTC"), 0.5),
            ),
            (
                "b".to_string(),
                output_with_field("symbol", json!("BTC"), 0.9),
            ),
        ]);

        assert_eq!(merged.fields["symbol"], json!("BTC"));
        assert!(!merged.fields.contains_key(DISCARDED_KEY));
    }

    #[test]
    fn duplicate_entities_keep_the_stronger_claim() {
        let mut a = StrategyOutput {
            confidence: 0.5,
            ..StrategyOutput::default()
        };
        a.entities.push(entity("bitcoin", 0.6));
        let mut b = StrategyOutput {
            confidence: 0.5,
            ..StrategyOutput::default()
        };
        b.entities.push(entity("Bitcoin", 0.9));

        let merged = merge_outputs(vec![("a".to_string(), a), ("b".to_string(), b)]);

        assert_eq!(merged.entities.len(), 1);
        assert_eq!(merged.entities[0].name, "Bitcoin");
        assert_eq!(merged.entities[0].confidence, 0.9);

        let trail = &merged.entities[0].properties[DISCARDED_KEY];
        assert_eq!(trail[0]["name"], json!("bitcoin"));
    }

    #[test]
    fn out_of_range_confidences_are_clamped() {
        let merged = merge_outputs(vec![(
            "a".to_string(),
            StrategyOutput {
                entities: vec![entity("bitcoin", 1.7)],
                confidence: 2.0,
                ..StrategyOutput::default()
            },
        )]);

        assert_eq!(merged.entities[0].confidence, 1.0);
    }
}
