//! Regex-based default extractor (mentions and relation candidates).

use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

use super::{ExtractionBatch, RawMention, RelationCandidate, SentenceExtractor};
use crate::config::ExtractionConfig;
use crate::error::{LexigraphError, Result};

/// Common sentence-initial words that are capitalized without naming anything.
const STOPWORDS: &[&str] = &[
    "The", "A", "An", "In", "On", "At", "It", "He", "She", "They", "We", "I", "This", "That",
    "These", "Those", "But", "And", "Or", "If", "When", "While", "After", "Before", "There",
];

/// Pattern-matching extractor: capitalized phrases become mentions, configured
/// relation patterns become candidates.
///
/// Entity typing is a naive heuristic (org suffixes, acronyms, numerics);
/// deployments needing real NER plug in their own [`SentenceExtractor`].
#[derive(Debug)]
pub struct PatternExtractor {
    mention_re: Regex,
    relation_patterns: Vec<(String, Regex)>,
    entity_types: HashSet<String>,
}

impl PatternExtractor {
    /// Compile the configured relation patterns. Invalid user-supplied
    /// patterns are a configuration error.
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let mention_re = Regex::new(r"[A-Z][A-Za-z0-9]*(?:\s+[A-Z][A-Za-z0-9]*)*")
            .expect("Invalid regex pattern");

        let mut relation_patterns = Vec::with_capacity(config.relation_patterns.len());
        for (label, pattern) in &config.relation_patterns {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    LexigraphError::Config(format!(
                        "invalid relation pattern '{}' for '{}': {}",
                        pattern, label, e
                    ))
                })?;
            relation_patterns.push((label.clone(), re));
        }

        Ok(Self {
            mention_re,
            relation_patterns,
            entity_types: config.entity_types.iter().cloned().collect(),
        })
    }

    fn extract_mentions(&self, sentence: &str) -> Vec<RawMention> {
        let mut mentions = Vec::new();
        for m in self.mention_re.find_iter(sentence) {
            let text = m.as_str();
            // Sentence-initial capitalization is not evidence of a name
            if m.start() == 0 && STOPWORDS.contains(&text) {
                continue;
            }
            let entity_type = guess_entity_type(text);
            if !self.entity_types.contains(entity_type) {
                continue;
            }
            mentions.push(RawMention {
                text: text.to_string(),
                entity_type: entity_type.to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
        mentions
    }

    fn extract_candidates(&self, sentence: &str) -> Vec<RelationCandidate> {
        let mut candidates = Vec::new();
        for (label, re) in &self.relation_patterns {
            for cap in re.captures_iter(sentence) {
                let (source, target, relation_label) = if label == "has_role" {
                    // (person1) is (person2)'s (role) -> person1 is_<role>_of person2
                    match (cap.get(1), cap.get(2), cap.get(3)) {
                        (Some(p1), Some(p2), Some(role)) => (
                            p1.as_str(),
                            p2.as_str(),
                            format!("is_{}_of", role.as_str().to_lowercase()),
                        ),
                        _ => continue,
                    }
                } else {
                    match (cap.get(1), cap.get(2)) {
                        (Some(s), Some(t)) => (s.as_str(), t.as_str(), label.clone()),
                        _ => continue,
                    }
                };
                candidates.push(RelationCandidate {
                    source_text: source.to_string(),
                    relation_label,
                    target_text: target.to_string(),
                    sentence: sentence.to_string(),
                });
            }
        }
        candidates
    }
}

impl SentenceExtractor for PatternExtractor {
    fn extract(&self, sentence: &str) -> Result<ExtractionBatch> {
        Ok(ExtractionBatch {
            mentions: self.extract_mentions(sentence),
            candidates: self.extract_candidates(sentence),
        })
    }
}

/// Naive entity typing: org suffixes and acronyms, numerics, else person.
fn guess_entity_type(text: &str) -> &'static str {
    const ORG_SUFFIXES: &[&str] = &[
        "Inc", "Corp", "Ltd", "LLC", "Labs", "Company", "University", "Institute",
    ];
    if text.chars().all(|c| c.is_ascii_digit()) {
        return "CARDINAL";
    }
    if let Some(last) = text.split_whitespace().last() {
        if ORG_SUFFIXES.contains(&last) {
            return "ORG";
        }
    }
    if text.len() >= 2 && !text.contains(' ') && text.chars().all(|c| c.is_ascii_uppercase()) {
        return "ORG";
    }
    "PERSON"
}
