//! Extraction fan-out/fan-in pipeline.
//!
//! One bounded worker task per sentence, reduced strictly in submission
//! order so canonical entity identity never depends on worker completion
//! order. The content-addressed cache short-circuits identical inputs.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;

use super::{ExtractionBatch, SentenceExtractor};
use crate::cache::{fingerprint, ExtractionCache};
use crate::config::ExtractionConfig;

/// Split text into sentences with their byte offsets.
///
/// Terminal-punctuation splitter: a `.`, `!` or `?` followed by whitespace
/// (or end of input) closes a sentence. Good enough to unit-of-work the
/// fan-out; extractors see whole sentences either way.
pub fn split_sentences(text: &str) -> Vec<(usize, String)> {
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let bytes = text.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if matches!(c, '.' | '!' | '?') {
            let at_end = i + 1 >= bytes.len();
            let before_space = !at_end && (bytes[i + 1] as char).is_whitespace();
            if at_end || before_space {
                let sentence = text[start..=i].trim();
                if !sentence.is_empty() {
                    let offset = start + (text[start..=i].len() - text[start..=i].trim_start().len());
                    sentences.push((offset, sentence.to_string()));
                }
                start = i + 1;
            }
        }
        i += 1;
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        let offset = start + (text[start..].len() - text[start..].trim_start().len());
        sentences.push((offset, tail.to_string()));
    }
    sentences
}

/// Run extraction over `text`: consult the cache, fan out per sentence with
/// bounded parallelism, and reduce results in submission order.
///
/// A failing sentence task is isolated: it is logged and contributes an
/// empty batch, it never aborts the siblings or the call.
pub async fn extract_text(
    text: &str,
    extractor: Arc<dyn SentenceExtractor>,
    cache: Option<&ExtractionCache>,
    config: &ExtractionConfig,
) -> ExtractionBatch {
    let type_refs: Vec<&str> = config.entity_types.iter().map(|s| s.as_str()).collect();
    let key = fingerprint(text, &type_refs);

    if let Some(cache) = cache {
        if let Some(value) = cache.get(&key) {
            match serde_json::from_value::<ExtractionBatch>(value) {
                Ok(batch) => {
                    log::info!("Using cached extraction results");
                    return batch;
                }
                Err(e) => {
                    log::warn!("Ignoring malformed cache record: {}", e);
                }
            }
        }
    }

    let sentences = split_sentences(text);
    log::debug!(
        "Extracting from {} sentence(s) with {} worker(s)",
        sentences.len(),
        config.num_workers
    );

    // buffered() yields results in stream order regardless of which worker
    // finishes first, which keeps the fan-in deterministic.
    let results: Vec<(usize, crate::error::Result<ExtractionBatch>)> =
        stream::iter(sentences.into_iter().enumerate())
            .map(|(idx, (offset, sentence))| {
                let extractor = Arc::clone(&extractor);
                async move {
                    let joined = tokio::task::spawn_blocking(move || {
                        extractor.extract(&sentence)
                    })
                    .await;
                    match joined {
                        Ok(result) => (offset, result),
                        Err(e) => (
                            offset,
                            Err(crate::error::LexigraphError::Extraction(format!(
                                "worker task {} panicked: {}",
                                idx, e
                            ))),
                        ),
                    }
                }
            })
            .buffered(config.num_workers)
            .collect()
            .await;

    let mut combined = ExtractionBatch::default();
    for (idx, (offset, result)) in results.into_iter().enumerate() {
        match result {
            Ok(batch) => combined.absorb(batch, offset),
            Err(e) => {
                log::error!("Extraction failed for sentence {}: {}", idx, e);
            }
        }
    }

    if let Some(cache) = cache {
        match serde_json::to_value(&combined) {
            Ok(value) => cache.set(&key, value),
            Err(e) => log::warn!("Failed to serialize extraction batch for cache: {}", e),
        }
    }

    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LexigraphError, Result};
    use crate::extract::PatternExtractor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn config() -> ExtractionConfig {
        ExtractionConfig::default()
    }

    #[test]
    fn test_split_sentences_basic() {
        let sentences = split_sentences("Alice works for Acme. Bob founded Initech!");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].1, "Alice works for Acme.");
        assert_eq!(sentences[1].1, "Bob founded Initech!");
    }

    #[test]
    fn test_split_sentences_offsets() {
        let text = "First one. Second one.";
        let sentences = split_sentences(text);
        for (offset, sentence) in &sentences {
            assert_eq!(&text[*offset..*offset + sentence.len()], sentence.as_str());
        }
    }

    #[test]
    fn test_split_sentences_no_terminal_punctuation() {
        let sentences = split_sentences("no punctuation at all");
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].1, "no punctuation at all");
    }

    #[test]
    fn test_split_sentences_abbreviation_dot_mid_token() {
        // A dot not followed by whitespace does not split
        let sentences = split_sentences("Version 1.2 shipped. Done.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].1, "Version 1.2 shipped.");
    }

    #[tokio::test]
    async fn test_extract_text_combines_sentences_in_order() {
        let extractor = Arc::new(PatternExtractor::new(&config()).unwrap());
        let batch = extract_text(
            "Alice works for Acme. Bob works for Initech.",
            extractor,
            None,
            &config(),
        )
        .await;

        assert_eq!(batch.candidates.len(), 2);
        // Submission-order fan-in: first sentence's candidate comes first
        assert_eq!(batch.candidates[0].source_text, "Alice");
        assert_eq!(batch.candidates[1].source_text, "Bob");
    }

    #[tokio::test]
    async fn test_extract_text_mention_offsets_are_text_relative() {
        let text = "Nothing here. Alice works for Acme.";
        let extractor = Arc::new(PatternExtractor::new(&config()).unwrap());
        let batch = extract_text(text, extractor, None, &config()).await;

        let alice = batch.mentions.iter().find(|m| m.text == "Alice").unwrap();
        assert_eq!(&text[alice.start..alice.end], "Alice");
    }

    /// Fails on a cue word, counts total calls.
    struct FlakyExtractor {
        calls: AtomicUsize,
    }

    impl SentenceExtractor for FlakyExtractor {
        fn extract(&self, sentence: &str) -> Result<ExtractionBatch> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if sentence.contains("boom") {
                return Err(LexigraphError::Extraction("boom".to_string()));
            }
            Ok(ExtractionBatch {
                mentions: vec![crate::extract::RawMention {
                    text: sentence.split_whitespace().next().unwrap_or("").to_string(),
                    entity_type: "PERSON".to_string(),
                    start: 0,
                    end: 1,
                }],
                candidates: vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_worker_failure_is_isolated() {
        let extractor = Arc::new(FlakyExtractor {
            calls: AtomicUsize::new(0),
        });
        let batch = extract_text("Alpha ok. boom now. Gamma ok.", extractor.clone(), None, &config()).await;

        // The failing sentence contributes nothing; siblings survive
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 3);
        let texts: Vec<_> = batch.mentions.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["Alpha", "Gamma"]);
    }

    #[tokio::test]
    async fn test_cache_short_circuits_second_call() {
        let temp = TempDir::new().unwrap();
        let cache = ExtractionCache::new(temp.path(), 10).unwrap();
        let extractor = Arc::new(FlakyExtractor {
            calls: AtomicUsize::new(0),
        });

        let first = extract_text("Alpha one. Beta two.", extractor.clone(), Some(&cache), &config()).await;
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);

        let second = extract_text("Alpha one. Beta two.", extractor.clone(), Some(&cache), &config()).await;
        // No further extractor calls: served from cache
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_cache_key_depends_on_vocabulary() {
        let temp = TempDir::new().unwrap();
        let cache = ExtractionCache::new(temp.path(), 10).unwrap();
        let extractor = Arc::new(FlakyExtractor {
            calls: AtomicUsize::new(0),
        });

        let _ = extract_text("Alpha one.", extractor.clone(), Some(&cache), &config()).await;
        let mut narrowed = config();
        narrowed.entity_types = vec!["ORG".to_string()];
        let _ = extract_text("Alpha one.", extractor.clone(), Some(&cache), &narrowed).await;

        // Different vocabulary means a different fingerprint, so re-extract
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
    }
}
