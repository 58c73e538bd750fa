//! Common types used across the DocRAG pipeline

use serde::{Deserialize, Serialize};

/// A bounded span of source text, the atomic retrievable unit.
///
/// Ids are assigned sequentially from 0 when the document is chunked and
/// passages are never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: u64,
    pub text: String,
}

impl Passage {
    pub fn new(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Number of whitespace-separated words in the passage
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A passage returned by a nearest-neighbour search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub id: u64,
    pub text: String,
    /// Squared Euclidean distance to the query embedding
    pub distance: f32,
}

/// One question/answer exchange of an interactive session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
}
