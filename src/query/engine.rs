//! Query engine: a small command grammar over the knowledge graph.
//!
//! Every command returns the same `{success, message, data}` structure so
//! presentation layers (CLI, REPL, anything else) can render uniformly.
//! Failures are responses, never panics or process exits.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::{json, Value};

use crate::graph::{EntityRecord, KnowledgeGraph};

/// Uniform query response. The shape of this struct is a stable contract.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<Value>,
}

impl QueryResponse {
    fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

fn command_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("Invalid regex pattern")
}

/// Read-only query dispatcher over a knowledge graph.
pub struct QueryEngine<'g> {
    graph: &'g KnowledgeGraph,
    find_re: Regex,
    path_re: Regex,
    related_re: Regex,
    count_re: Regex,
    export_re: Regex,
    help_re: Regex,
}

impl<'g> QueryEngine<'g> {
    pub fn new(graph: &'g KnowledgeGraph) -> Self {
        Self {
            graph,
            find_re: command_regex(r"^find\s+(.+)$"),
            path_re: command_regex(r"^path\s+from\s+(.+)\s+to\s+(.+)$"),
            related_re: command_regex(r"^related\s+(.+)$"),
            count_re: command_regex(r"^count\s+(.+)$"),
            export_re: command_regex(r"^export\s+(.+)$"),
            help_re: command_regex(r"^help$"),
        }
    }

    /// Execute one command string.
    pub fn execute(&self, query: &str) -> QueryResponse {
        let query = query.trim();

        if let Some(cap) = self.find_re.captures(query) {
            return self.handle_find(cap[1].trim());
        }
        if let Some(cap) = self.path_re.captures(query) {
            return self.handle_path(cap[1].trim(), cap[2].trim());
        }
        if let Some(cap) = self.related_re.captures(query) {
            return self.handle_related(cap[1].trim());
        }
        if let Some(cap) = self.count_re.captures(query) {
            return self.handle_count(cap[1].trim());
        }
        if let Some(cap) = self.export_re.captures(query) {
            return self.handle_export(cap[1].trim());
        }
        if self.help_re.is_match(query) {
            return self.handle_help();
        }

        // Lenient fallback: anything mentioning find/show is retried as a find
        let lowered = query.to_lowercase();
        if lowered.contains("find") || lowered.contains("show") {
            let words: Vec<&str> = query.split_whitespace().collect();
            if words.len() > 1 {
                return self.handle_find(&words[1..].join(" "));
            }
        }

        QueryResponse::fail("I don't understand that query. Try 'help' for a list of commands.")
    }

    fn handle_find(&self, name: &str) -> QueryResponse {
        let entity = self
            .graph
            .get_entity(name)
            .or_else(|| self.graph.get_entity_case_insensitive(name));

        match entity {
            Some(entity) => {
                let relations = self.graph.get_relations(&entity.canonical_key);
                QueryResponse::ok(
                    format!("Found entity: {}", entity.canonical_key),
                    Some(json!({
                        "entity": EntityRecord::from(entity),
                        "relations": relations,
                    })),
                )
            }
            None => QueryResponse::fail(format!("Entity '{}' not found.", name)),
        }
    }

    fn handle_path(&self, source: &str, target: &str) -> QueryResponse {
        if self.graph.get_entity(source).is_none() {
            return QueryResponse::fail(format!("Source entity '{}' not found.", source));
        }
        if self.graph.get_entity(target).is_none() {
            return QueryResponse::fail(format!("Target entity '{}' not found.", target));
        }

        let path = self.graph.get_path(source, target);
        if path.is_empty() {
            return QueryResponse::fail(format!(
                "No path found from '{}' to '{}'.",
                source, target
            ));
        }
        QueryResponse::ok(
            format!("Found path from '{}' to '{}'", source, target),
            Some(json!({
                "length": path.len(),
                "path": path,
            })),
        )
    }

    fn handle_related(&self, name: &str) -> QueryResponse {
        let entity = match self.graph.get_entity(name) {
            Some(entity) => entity,
            None => return QueryResponse::fail(format!("Entity '{}' not found.", name)),
        };

        let direct_relations = self.graph.get_relations(&entity.canonical_key);

        // Entities sharing a relation of the same type with one of our
        // direct neighbors, capped at 5, in discovery order.
        let mut similar = Vec::new();
        'outer: for rel in &direct_relations {
            for other_rel in self.graph.get_relations(&rel.entity) {
                if other_rel.entity != entity.canonical_key
                    && other_rel.relation_type == rel.relation_type
                {
                    similar.push(json!({
                        "entity": other_rel.entity,
                        "shared_relation_type": rel.relation_type,
                        "via": rel.entity,
                    }));
                    if similar.len() == 5 {
                        break 'outer;
                    }
                }
            }
        }

        QueryResponse::ok(
            format!("Found related entities for '{}'", name),
            Some(json!({
                "direct_relations": direct_relations,
                "similar_entities": similar,
            })),
        )
    }

    fn handle_count(&self, what: &str) -> QueryResponse {
        let summary = self.graph.summary();
        let counts: std::collections::BTreeMap<String, usize> = match what.to_lowercase().as_str()
        {
            "entities" => summary.entity_types,
            "relations" => summary.relation_types,
            _ => {
                let count = self
                    .graph
                    .entities()
                    .filter(|e| e.entity_type.eq_ignore_ascii_case(what))
                    .count();
                [(what.to_string(), count)].into_iter().collect()
            }
        };
        let total: usize = counts.values().sum();

        QueryResponse::ok(
            format!("Count for {}", what),
            Some(json!({
                "counts": counts,
                "total": total,
            })),
        )
    }

    fn handle_export(&self, path: &str) -> QueryResponse {
        match self.graph.save(path) {
            Ok(()) => QueryResponse::ok(
                format!("Knowledge graph exported to {}", path),
                None,
            ),
            Err(e) => QueryResponse::fail(format!("Error exporting knowledge graph: {}", e)),
        }
    }

    fn handle_help(&self) -> QueryResponse {
        let commands = json!([
            {"command": "find <entity>", "description": "Find information about an entity"},
            {"command": "path from <entity1> to <entity2>", "description": "Find the shortest path between two entities"},
            {"command": "related <entity>", "description": "Find entities related to the given entity"},
            {"command": "count entities", "description": "Count entities by type"},
            {"command": "count relations", "description": "Count relations by type"},
            {"command": "count <type>", "description": "Count entities of a specific type"},
            {"command": "export <filename>", "description": "Export the knowledge graph to a file"},
            {"command": "help", "description": "Show this help message"},
            {"command": "exit", "description": "Exit the program"},
        ]);
        QueryResponse::ok("Available commands:", Some(json!({ "commands": commands })))
    }
}
