//! Sentence-aligned, word-bounded chunking

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use docrag_core::{Error, Passage, Result};

/// Word-count thresholds for chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// A chunk is closed as soon as it holds at least this many words
    pub min_words: usize,
    /// A sentence that would push a non-empty chunk past this starts a new chunk
    pub max_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            min_words: 100,
            max_words: 300,
        }
    }
}

impl ChunkingConfig {
    pub fn new(min_words: usize, max_words: usize) -> Result<Self> {
        if min_words == 0 {
            return Err(Error::Configuration("min_words must be at least 1".to_string()));
        }
        if max_words < min_words {
            return Err(Error::Configuration(format!(
                "max_words ({}) must not be smaller than min_words ({})",
                max_words, min_words
            )));
        }
        Ok(Self { min_words, max_words })
    }
}

/// Collapse every run of whitespace to a single space and trim both ends
pub fn clean_text(text: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("static regex"));
    whitespace.replace_all(text, " ").trim().to_string()
}

/// Split text on Unicode sentence boundaries, dropping empty sentences
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

/// Greedy sentence accumulator
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Split already-cleaned text into chunks.
    ///
    /// Chunks end on sentence boundaries. A single sentence longer than
    /// `max_words` is kept whole, and a trailing chunk shorter than
    /// `min_words` is still emitted.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0;

        for sentence in split_sentences(text) {
            let words = sentence.split_whitespace().count();

            if !current.is_empty() && current_len + words > self.config.max_words {
                chunks.push(current.join(" "));
                current.clear();
                current_len = 0;
            }

            current.push(sentence);
            current_len += words;

            if current_len >= self.config.min_words {
                chunks.push(current.join(" "));
                current.clear();
                current_len = 0;
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        chunks
    }

    /// Clean raw document text, chunk it, and number the chunks from 0
    pub fn passages(&self, raw_text: &str) -> Vec<Passage> {
        self.chunk(&clean_text(raw_text))
            .into_iter()
            .enumerate()
            .map(|(i, text)| Passage::new(i as u64, text))
            .collect()
    }
}
