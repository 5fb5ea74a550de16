//! The directed graph store: entity/relation insertion, lookup, BFS paths,
//! and summaries.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use super::{Entity, Relation};
use crate::error::{LexigraphError, Result};

/// Whether an edge points away from or towards the queried entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// One edge as seen from a queried entity.
#[derive(Debug, Clone, Serialize)]
pub struct RelationView {
    pub direction: Direction,
    pub relation_type: String,
    /// Canonical key of the entity at the other end
    pub entity: String,
    pub sentence: String,
}

/// One traversed edge on a shortest path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathStep {
    pub source: String,
    pub target: String,
    pub relation_type: String,
    pub sentence: String,
}

/// Aggregate view of the graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSummary {
    pub num_entities: usize,
    pub num_relations: usize,
    pub entity_types: BTreeMap<String, usize>,
    pub relation_types: BTreeMap<String, usize>,
    pub most_connected: Vec<ConnectedEntity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectedEntity {
    pub entity: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub connections: usize,
}

/// In-memory directed knowledge graph.
///
/// Single-writer: all mutation happens on the reduction thread after
/// extraction workers join. Multiple relations between the same ordered
/// entity pair are kept as an append-only list, never overwritten.
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    entities: HashMap<String, Entity>,
    /// Canonical keys in insertion order (summary tie-breaks, snapshots)
    order: Vec<String>,
    relations: Vec<Relation>,
    out_edges: HashMap<String, Vec<usize>>,
    in_edges: HashMap<String, Vec<usize>>,
    pair_edges: HashMap<(String, String), Vec<usize>>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, or merge occurrences/mentions into an existing one.
    /// Canonical key and display text are immutable after first insertion.
    pub fn add_entity(&mut self, entity: Entity) {
        match self.entities.get_mut(&entity.canonical_key) {
            Some(existing) => existing.merge(&entity),
            None => {
                self.order.push(entity.canonical_key.clone());
                self.entities.insert(entity.canonical_key.clone(), entity);
            }
        }
    }

    /// Append a relation. Both endpoints must already be present.
    pub fn add_relation(&mut self, relation: Relation) -> Result<()> {
        if !self.entities.contains_key(&relation.source) {
            return Err(LexigraphError::EntityNotFound(relation.source));
        }
        if !self.entities.contains_key(&relation.target) {
            return Err(LexigraphError::EntityNotFound(relation.target));
        }

        let idx = self.relations.len();
        self.out_edges
            .entry(relation.source.clone())
            .or_default()
            .push(idx);
        self.in_edges
            .entry(relation.target.clone())
            .or_default()
            .push(idx);
        self.pair_edges
            .entry((relation.source.clone(), relation.target.clone()))
            .or_default()
            .push(idx);
        self.relations.push(relation);
        Ok(())
    }

    pub fn get_entity(&self, key: &str) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Case-insensitive entity lookup, scanning in insertion order.
    pub fn get_entity_case_insensitive(&self, key: &str) -> Option<&Entity> {
        let lowered = key.to_lowercase();
        self.order
            .iter()
            .find(|k| k.to_lowercase() == lowered)
            .and_then(|k| self.entities.get(k))
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|k| self.entities.get(k))
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    pub fn num_relations(&self) -> usize {
        self.relations.len()
    }

    /// All edges touching an entity, outgoing first, direction-tagged.
    pub fn get_relations(&self, key: &str) -> Vec<RelationView> {
        let mut views = Vec::new();
        if let Some(indices) = self.out_edges.get(key) {
            for &idx in indices {
                let r = &self.relations[idx];
                views.push(RelationView {
                    direction: Direction::Outgoing,
                    relation_type: r.relation_type.clone(),
                    entity: r.target.clone(),
                    sentence: r.sentence.clone(),
                });
            }
        }
        if let Some(indices) = self.in_edges.get(key) {
            for &idx in indices {
                let r = &self.relations[idx];
                views.push(RelationView {
                    direction: Direction::Incoming,
                    relation_type: r.relation_type.clone(),
                    entity: r.source.clone(),
                    sentence: r.sentence.clone(),
                });
            }
        }
        views
    }

    /// The most recently added relation on an ordered pair, if any.
    pub fn edge(&self, source: &str, target: &str) -> Option<&Relation> {
        self.pair_edges
            .get(&(source.to_string(), target.to_string()))
            .and_then(|indices| indices.last())
            .map(|&idx| &self.relations[idx])
    }

    /// Every relation ever added on an ordered pair, in insertion order.
    pub fn edges_between(&self, source: &str, target: &str) -> Vec<&Relation> {
        self.pair_edges
            .get(&(source.to_string(), target.to_string()))
            .map(|indices| indices.iter().map(|&idx| &self.relations[idx]).collect())
            .unwrap_or_default()
    }

    /// Shortest directed path by edge count (BFS). Returns one step per
    /// traversed edge, carrying the latest relation on that pair. Empty if
    /// either endpoint is absent or no path exists.
    pub fn get_path(&self, source: &str, target: &str) -> Vec<PathStep> {
        if !self.entities.contains_key(source) || !self.entities.contains_key(target) {
            return Vec::new();
        }
        if source == target {
            return Vec::new();
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        let mut predecessor: HashMap<&str, &str> = HashMap::new();

        visited.insert(source);
        queue.push_back(source);

        'bfs: while let Some(node) = queue.pop_front() {
            if let Some(indices) = self.out_edges.get(node) {
                for &idx in indices {
                    let next = self.relations[idx].target.as_str();
                    if visited.insert(next) {
                        predecessor.insert(next, node);
                        if next == target {
                            break 'bfs;
                        }
                        queue.push_back(next);
                    }
                }
            }
        }

        if !predecessor.contains_key(target) {
            return Vec::new();
        }

        // Walk predecessors back from the target, then reverse
        let mut nodes = vec![target];
        let mut cursor = target;
        while let Some(&prev) = predecessor.get(cursor) {
            nodes.push(prev);
            cursor = prev;
        }
        nodes.reverse();

        nodes
            .windows(2)
            .filter_map(|pair| {
                self.edge(pair[0], pair[1]).map(|r| PathStep {
                    source: pair[0].to_string(),
                    target: pair[1].to_string(),
                    relation_type: r.relation_type.clone(),
                    sentence: r.sentence.clone(),
                })
            })
            .collect()
    }

    /// Total degree (in + out) of an entity, counting parallel edges.
    fn degree(&self, key: &str) -> usize {
        self.out_edges.get(key).map(|v| v.len()).unwrap_or(0)
            + self.in_edges.get(key).map(|v| v.len()).unwrap_or(0)
    }

    /// Counts plus the top 5 entities by degree, encounter order breaking ties.
    pub fn summary(&self) -> GraphSummary {
        let mut entity_types: BTreeMap<String, usize> = BTreeMap::new();
        for entity in self.entities() {
            *entity_types.entry(entity.entity_type.clone()).or_default() += 1;
        }
        let mut relation_types: BTreeMap<String, usize> = BTreeMap::new();
        for relation in &self.relations {
            *relation_types
                .entry(relation.relation_type.clone())
                .or_default() += 1;
        }

        let mut ranked: Vec<&String> = self.order.iter().collect();
        // Stable sort keeps insertion order within equal degrees
        ranked.sort_by_key(|k| std::cmp::Reverse(self.degree(k.as_str())));
        let most_connected = ranked
            .into_iter()
            .take(5)
            .filter_map(|k| {
                self.entities.get(k).map(|e| ConnectedEntity {
                    entity: k.clone(),
                    entity_type: e.entity_type.clone(),
                    connections: self.degree(k),
                })
            })
            .collect();

        GraphSummary {
            num_entities: self.entities.len(),
            num_relations: self.relations.len(),
            entity_types,
            relation_types,
            most_connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(source: &str, rtype: &str, target: &str) -> Relation {
        Relation {
            source: source.to_string(),
            relation_type: rtype.to_string(),
            target: target.to_string(),
            sentence: format!("{} {} {}.", source, rtype, target),
        }
    }

    fn chain_graph() -> KnowledgeGraph {
        // a -> b -> c -> d
        let mut g = KnowledgeGraph::new();
        for key in ["a", "b", "c", "d"] {
            g.add_entity(Entity::new(key, "PERSON"));
        }
        g.add_relation(relation("a", "knows", "b")).unwrap();
        g.add_relation(relation("b", "knows", "c")).unwrap();
        g.add_relation(relation("c", "knows", "d")).unwrap();
        g
    }

    #[test]
    fn test_add_entity_idempotent_merge() {
        let mut g = KnowledgeGraph::new();
        g.add_entity(Entity::new("Google", "ORG"));
        g.add_entity(Entity::new("Google", "ORG"));
        g.add_entity(Entity::new("Google", "ORG"));

        let e = g.get_entity("Google").unwrap();
        assert_eq!(e.occurrence_count, 3);
        assert_eq!(e.canonical_key, "Google");
        assert_eq!(e.display_text, "Google");
        assert_eq!(g.num_entities(), 1);
    }

    #[test]
    fn test_add_relation_requires_endpoints() {
        let mut g = KnowledgeGraph::new();
        g.add_entity(Entity::new("a", "PERSON"));
        let err = g.add_relation(relation("a", "knows", "ghost")).unwrap_err();
        assert!(matches!(err, LexigraphError::EntityNotFound(_)));
        assert_eq!(g.num_relations(), 0);
    }

    #[test]
    fn test_parallel_edges_are_all_retained() {
        let mut g = KnowledgeGraph::new();
        g.add_entity(Entity::new("a", "PERSON"));
        g.add_entity(Entity::new("b", "ORG"));
        g.add_relation(relation("a", "works_for", "b")).unwrap();
        g.add_relation(relation("a", "founded", "b")).unwrap();

        let edges = g.edges_between("a", "b");
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].relation_type, "works_for");
        assert_eq!(edges[1].relation_type, "founded");
        // edge() exposes the latest
        assert_eq!(g.edge("a", "b").unwrap().relation_type, "founded");
        assert_eq!(g.num_relations(), 2);
    }

    #[test]
    fn test_get_relations_direction_tagged() {
        let mut g = KnowledgeGraph::new();
        g.add_entity(Entity::new("a", "PERSON"));
        g.add_entity(Entity::new("b", "ORG"));
        g.add_entity(Entity::new("c", "PERSON"));
        g.add_relation(relation("a", "works_for", "b")).unwrap();
        g.add_relation(relation("c", "founded", "b")).unwrap();

        let views = g.get_relations("b");
        assert_eq!(views.len(), 2);
        let incoming: Vec<_> = views
            .iter()
            .filter(|v| v.direction == Direction::Incoming)
            .collect();
        assert_eq!(incoming.len(), 2);

        let views = g.get_relations("a");
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].direction, Direction::Outgoing);
        assert_eq!(views[0].entity, "b");
    }

    #[test]
    fn test_path_three_steps() {
        let g = chain_graph();
        let path = g.get_path("a", "d");
        assert_eq!(path.len(), 3);
        assert_eq!((path[0].source.as_str(), path[0].target.as_str()), ("a", "b"));
        assert_eq!((path[1].source.as_str(), path[1].target.as_str()), ("b", "c"));
        assert_eq!((path[2].source.as_str(), path[2].target.as_str()), ("c", "d"));
        assert!(path.iter().all(|s| s.relation_type == "knows"));
    }

    #[test]
    fn test_path_respects_direction() {
        let g = chain_graph();
        // Edges run a->d only; the reverse has no directed route
        assert!(g.get_path("d", "a").is_empty());
    }

    #[test]
    fn test_path_missing_endpoint_is_empty_not_error() {
        let g = chain_graph();
        assert!(g.get_path("a", "zzz").is_empty());
        assert!(g.get_path("zzz", "a").is_empty());
    }

    #[test]
    fn test_path_disconnected_components() {
        let mut g = chain_graph();
        g.add_entity(Entity::new("island", "LOC"));
        assert!(g.get_path("a", "island").is_empty());
    }

    #[test]
    fn test_path_shortest_wins() {
        let mut g = chain_graph();
        // Shortcut a -> d
        g.add_relation(relation("a", "shortcut", "d")).unwrap();
        let path = g.get_path("a", "d");
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].relation_type, "shortcut");
    }

    #[test]
    fn test_path_survives_cycles() {
        let mut g = chain_graph();
        g.add_relation(relation("d", "knows", "a")).unwrap();
        let path = g.get_path("a", "d");
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_summary_counts_and_ranking() {
        let mut g = KnowledgeGraph::new();
        g.add_entity(Entity::new("Alice", "PERSON"));
        g.add_entity(Entity::new("Bob", "PERSON"));
        g.add_entity(Entity::new("Acme", "ORG"));
        g.add_relation(relation("Alice", "works_for", "Acme")).unwrap();
        g.add_relation(relation("Bob", "works_for", "Acme")).unwrap();

        let summary = g.summary();
        assert_eq!(summary.num_entities, 3);
        assert_eq!(summary.num_relations, 2);
        assert_eq!(summary.entity_types.get("PERSON"), Some(&2));
        assert_eq!(summary.entity_types.get("ORG"), Some(&1));
        assert_eq!(summary.relation_types.get("works_for"), Some(&2));
        // Acme has degree 2, Alice and Bob tie at 1; insertion order breaks the tie
        assert_eq!(summary.most_connected[0].entity, "Acme");
        assert_eq!(summary.most_connected[0].connections, 2);
        assert_eq!(summary.most_connected[1].entity, "Alice");
        assert_eq!(summary.most_connected[2].entity, "Bob");
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut g = KnowledgeGraph::new();
        g.add_entity(Entity::new("Alice", "PERSON"));
        assert!(g.get_entity("alice").is_none());
        assert_eq!(
            g.get_entity_case_insensitive("ALICE").unwrap().canonical_key,
            "Alice"
        );
    }
}
