//! Embedder trait

use async_trait::async_trait;

use crate::{Error, Result};

/// Trait for text embedders
///
/// An embedder maps text to a fixed-length vector. The same embedder (same
/// `model_id` and `dimension`) must be used at index time and at query time.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("embedder returned no vector".to_string()))
    }

    /// Output dimension of every vector
    fn dimension(&self) -> usize;

    /// Identifier of the underlying model, recorded in the index
    fn model_id(&self) -> &str;
}
