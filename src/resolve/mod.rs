//! Entity resolution and relation normalization.
//!
//! The resolver is the single-threaded fan-in: extraction workers have
//! already joined by the time mentions arrive here, so no locking is needed
//! and merge order equals submission order.

mod matcher;

pub use matcher::{
    matcher_from_name, CaseInsensitiveMatcher, EndpointMatcher, ExactMatcher, FuzzyMatcher,
};

use std::collections::HashMap;

use crate::error::{LexigraphError, Result};
use crate::extract::{RawMention, RelationCandidate};
use crate::graph::{Entity, Relation};

/// Canonical entities produced by one resolution pass, in encounter order.
#[derive(Debug, Default)]
pub struct ResolvedEntities {
    entities: Vec<Entity>,
    /// (normalized_text, entity_type) -> index into `entities`
    by_merge_key: HashMap<(String, String), usize>,
    /// canonical_key -> index into `entities`
    by_canonical: HashMap<String, usize>,
}

impl ResolvedEntities {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Exact lookup by canonical key.
    pub fn get(&self, canonical_key: &str) -> Option<&Entity> {
        self.by_canonical
            .get(canonical_key)
            .map(|&idx| &self.entities[idx])
    }

    /// Case-insensitive lookup over canonical keys, encounter order.
    pub fn get_case_insensitive(&self, key: &str) -> Option<&Entity> {
        let lowered = key.to_lowercase();
        self.entities
            .iter()
            .find(|e| e.canonical_key.to_lowercase() == lowered)
    }

    /// Entities in encounter order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn into_entities(self) -> Vec<Entity> {
        self.entities
    }
}

/// Deduplicate raw mentions into canonical entities.
///
/// Merge key is `(normalized_text, entity_type)`; the first mention with a
/// given key fixes the canonical key and display text, later ones only bump
/// `occurrence_count` and extend `mentions`.
pub fn resolve_mentions(mentions: impl IntoIterator<Item = RawMention>) -> ResolvedEntities {
    let mut resolved = ResolvedEntities::default();

    for mention in mentions {
        let entity = Entity::new(mention.text, mention.entity_type);
        let merge_key = entity.merge_key();
        match resolved.by_merge_key.get(&merge_key).copied() {
            Some(idx) => resolved.entities[idx].merge(&entity),
            None => {
                let idx = resolved.entities.len();
                resolved
                    .by_canonical
                    .insert(entity.canonical_key.clone(), idx);
                resolved.by_merge_key.insert(merge_key, idx);
                resolved.entities.push(entity);
            }
        }
    }

    resolved
}

/// Attach relation candidates to resolved entities.
///
/// Endpoints are resolved through the given matcher. Unresolvable candidates
/// are dropped with a debug log (partial-graph recall), or fail the whole
/// batch when `strict` is set.
pub fn normalize_candidates(
    candidates: &[RelationCandidate],
    entities: &ResolvedEntities,
    matcher: &dyn EndpointMatcher,
    strict: bool,
) -> Result<Vec<Relation>> {
    let mut relations = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let source = matcher.resolve(&candidate.source_text, entities);
        let target = matcher.resolve(&candidate.target_text, entities);
        match (source, target) {
            (Some(source), Some(target)) => relations.push(Relation {
                source: source.canonical_key.clone(),
                relation_type: candidate.relation_label.clone(),
                target: target.canonical_key.clone(),
                sentence: candidate.sentence.clone(),
            }),
            _ => {
                let missing = if source.is_none() {
                    &candidate.source_text
                } else {
                    &candidate.target_text
                };
                if strict {
                    return Err(LexigraphError::UnresolvedEndpoint(missing.clone()));
                }
                log::debug!(
                    "Dropping relation candidate '{}' --{}--> '{}': endpoint '{}' unresolved",
                    candidate.source_text,
                    candidate.relation_label,
                    candidate.target_text,
                    missing
                );
            }
        }
    }

    Ok(relations)
}
