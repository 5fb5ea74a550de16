//! Knowledge graph module: the directed entity/relation store, BFS paths,
//! summaries, and JSON snapshot serialization.

mod snapshot;
mod store;

pub use snapshot::{EntityRecord, GraphSnapshot};
pub use store::{ConnectedEntity, Direction, GraphSummary, KnowledgeGraph, PathStep, RelationView};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A canonical entity: a node in the knowledge graph.
///
/// The canonical key is the exact surface text of the first mention seen for
/// this entity and never changes afterwards; later mentions only contribute
/// to `occurrence_count` and `mentions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// Stable node identity (first-seen surface form, exact text)
    pub canonical_key: String,
    /// Original surface text at first sight
    pub display_text: String,
    /// Lowercased, trimmed form; used only for merge matching
    pub normalized_text: String,
    /// Label from the entity-type vocabulary
    pub entity_type: String,
    /// Incremented on every merge
    pub occurrence_count: u64,
    /// Every distinct surface form ever seen for this entity
    pub mentions: BTreeSet<String>,
}

impl Entity {
    /// Create an entity from its first mention.
    pub fn new(text: impl Into<String>, entity_type: impl Into<String>) -> Self {
        let text = text.into();
        let mut mentions = BTreeSet::new();
        mentions.insert(text.clone());
        Self {
            canonical_key: text.clone(),
            display_text: text.clone(),
            normalized_text: text.trim().to_lowercase(),
            entity_type: entity_type.into(),
            occurrence_count: 1,
            mentions,
        }
    }

    /// Merge key: entities with the same normalized text and type are one.
    pub fn merge_key(&self) -> (String, String) {
        (self.normalized_text.clone(), self.entity_type.clone())
    }

    /// Fold another entity's occurrences and surface forms into this one.
    /// Identity fields are left untouched.
    pub fn merge(&mut self, other: &Entity) {
        self.occurrence_count += other.occurrence_count;
        self.mentions.extend(other.mentions.iter().cloned());
    }
}

/// A directed relation: an edge between two resolved entities.
///
/// Field layout doubles as the snapshot wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Canonical key of the source entity
    pub source: String,
    pub relation_type: String,
    /// Canonical key of the target entity
    pub target: String,
    /// The sentence supporting the claim
    pub sentence: String,
}
