//! Extraction contract and the default pattern-based extractor.
//!
//! Mention/relation extraction is a pluggable capability: anything that can
//! turn a sentence into an [`ExtractionBatch`] can feed the graph. The
//! built-in [`PatternExtractor`] is a regex baseline (capitalized-phrase
//! mentions plus configured relation patterns); real deployments substitute
//! their own [`SentenceExtractor`].

mod patterns;
mod pipeline;

pub use patterns::PatternExtractor;
pub use pipeline::{extract_text, split_sentences};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A raw entity mention produced by an extractor, before deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMention {
    /// Surface text exactly as it appeared
    pub text: String,
    /// Label from the configured entity-type vocabulary
    pub entity_type: String,
    /// Byte offset of the mention start within the input text
    pub start: usize,
    /// Byte offset one past the mention end
    pub end: usize,
}

/// A candidate relation between two mention texts, before endpoint resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationCandidate {
    pub source_text: String,
    pub relation_label: String,
    pub target_text: String,
    /// The sentence supporting the claim (provenance)
    pub sentence: String,
}

/// Combined output of one extraction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionBatch {
    pub mentions: Vec<RawMention>,
    pub candidates: Vec<RelationCandidate>,
}

impl ExtractionBatch {
    /// Append another batch's output, shifting its mention offsets by `offset`.
    pub fn absorb(&mut self, mut other: ExtractionBatch, offset: usize) {
        for mention in &mut other.mentions {
            mention.start += offset;
            mention.end += offset;
        }
        self.mentions.append(&mut other.mentions);
        self.candidates.append(&mut other.candidates);
    }
}

/// Pluggable per-sentence extraction capability.
///
/// Implementations must be safe to call from multiple worker tasks at once.
pub trait SentenceExtractor: Send + Sync {
    /// Extract mentions and relation candidates from a single sentence.
    fn extract(&self, sentence: &str) -> Result<ExtractionBatch>;
}
