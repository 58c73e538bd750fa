//! RAG (Retrieval-Augmented Generation) engine trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, RetrievedPassage};

/// Query for RAG retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RAGQuery {
    pub query: String,
    pub top_k: usize,
}

impl RAGQuery {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
        }
    }
}

impl Default for RAGQuery {
    fn default() -> Self {
        Self {
            query: String::new(),
            top_k: 3,
        }
    }
}

/// Generated answer together with the passages it was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RAGResult {
    pub answer: String,
    /// Retrieved passages, nearest first
    pub sources: Vec<RetrievedPassage>,
    pub model_id: String,
}

impl RAGResult {
    /// Source texts in retrieval order
    pub fn source_texts(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.text.clone()).collect()
    }
}

/// Trait for RAG engines
///
/// An engine owns a loaded index and a language model and answers one
/// question at a time.
#[async_trait]
pub trait RAGEngine: Send + Sync {
    /// Retrieve the passages nearest to the query
    async fn retrieve(&self, query: &RAGQuery) -> Result<Vec<RetrievedPassage>>;

    /// Build the grounded prompt for a query and its retrieved passages
    fn build_prompt(&self, query: &str, passages: &[RetrievedPassage]) -> String;

    /// Retrieve, then generate an answer
    async fn answer(&self, query: &RAGQuery) -> Result<RAGResult>;

    /// Get statistics about the RAG engine
    fn stats(&self) -> serde_json::Value;
}
