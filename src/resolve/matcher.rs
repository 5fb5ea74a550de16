//! Pluggable endpoint matching strategies.
//!
//! Relation candidates name their endpoints by surface text; a matcher maps
//! that text onto a resolved entity. The fuzzy strategy can false-positive
//! when one entity's text is a substring of another's, so the strategy is
//! chosen in configuration rather than hard-coded.

use super::ResolvedEntities;
use crate::graph::Entity;

/// Maps endpoint text onto a resolved entity, or gives up.
pub trait EndpointMatcher: Send + Sync {
    fn resolve<'a>(&self, text: &str, entities: &'a ResolvedEntities) -> Option<&'a Entity>;
}

/// Exact canonical-key match only.
pub struct ExactMatcher;

impl EndpointMatcher for ExactMatcher {
    fn resolve<'a>(&self, text: &str, entities: &'a ResolvedEntities) -> Option<&'a Entity> {
        entities.get(text)
    }
}

/// Exact match, then case-insensitive.
pub struct CaseInsensitiveMatcher;

impl EndpointMatcher for CaseInsensitiveMatcher {
    fn resolve<'a>(&self, text: &str, entities: &'a ResolvedEntities) -> Option<&'a Entity> {
        entities
            .get(text)
            .or_else(|| entities.get_case_insensitive(text))
    }
}

/// Exact, then case-insensitive, then substring containment either way
/// against canonical keys. Lenient by intent: favors recall of a partial
/// graph over dropping candidates.
pub struct FuzzyMatcher;

impl EndpointMatcher for FuzzyMatcher {
    fn resolve<'a>(&self, text: &str, entities: &'a ResolvedEntities) -> Option<&'a Entity> {
        if let Some(entity) = CaseInsensitiveMatcher.resolve(text, entities) {
            return Some(entity);
        }
        let lowered = text.to_lowercase();
        entities.iter().find(|e| {
            let key = e.canonical_key.to_lowercase();
            key.contains(&lowered) || lowered.contains(&key)
        })
    }
}

/// Look up a matcher by its configuration name.
///
/// Names are validated at config load, so an unknown name here is a bug;
/// fall back to fuzzy with a warning rather than crash.
pub fn matcher_from_name(name: &str) -> Box<dyn EndpointMatcher> {
    match name {
        "exact" => Box::new(ExactMatcher),
        "case-insensitive" => Box::new(CaseInsensitiveMatcher),
        "fuzzy" => Box::new(FuzzyMatcher),
        other => {
            log::warn!("Unknown endpoint matcher '{}', using fuzzy", other);
            Box::new(FuzzyMatcher)
        }
    }
}
