//! Query-time nearest-neighbour retrieval

use std::sync::Arc;

use tracing::debug;

use docrag_core::{Embedder, Error, Result, RetrievedPassage};

use crate::index::VectorIndex;

/// Embeds queries and searches a loaded index.
///
/// Both the embedder and the index are shared read-only, so one retriever
/// serves every query of a session.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
}

impl Retriever {
    /// Pair an embedder with an index, refusing a different embedding model
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<VectorIndex>) -> Result<Self> {
        let built_with = index.index();
        if built_with.model_id() != embedder.model_id() || built_with.dimension() != embedder.dimension() {
            return Err(Error::ModelMismatch {
                index: built_with.model_id().to_string(),
                index_dim: built_with.dimension(),
                query: embedder.model_id().to_string(),
                query_dim: embedder.dimension(),
            });
        }
        Ok(Self { embedder, index })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Return up to `top_k` passages nearest to `query`, nearest first.
    ///
    /// When the index holds fewer than `top_k` passages, all of them are returned.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }
        if top_k == 0 {
            return Err(Error::InvalidInput("top_k must be at least 1".to_string()));
        }

        let query_embedding = self.embedder.embed(query).await?;
        let results = self.index.search(&query_embedding, top_k)?;

        debug!(
            top_k,
            returned = results.len(),
            nearest = results.first().map(|r| r.id),
            "Retrieved passages"
        );
        Ok(results)
    }
}
