//! Offline index build: embed every passage and persist the flat index

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use docrag_core::{Embedder, Error, Passage, Result};

use crate::index::{FlatL2Index, Mapping, VectorIndex};

/// Configuration for the index build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Number of passages sent to the embedder per call
    pub batch_size: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self { batch_size: 32 }
    }
}

/// Result of an index build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingReport {
    pub passages_indexed: usize,
    pub dimension: usize,
    pub model_id: String,
}

/// Builds a [`VectorIndex`] from passages with a given embedder
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    config: IndexingConfig,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self::with_config(embedder, IndexingConfig::default())
    }

    pub fn with_config(embedder: Arc<dyn Embedder>, config: IndexingConfig) -> Self {
        Self { embedder, config }
    }

    /// Embed the passages in order and build the index.
    ///
    /// Slot `i` of the returned index holds the embedding of `passages[i]`.
    pub async fn build(&self, passages: &[Passage]) -> Result<VectorIndex> {
        if passages.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let dimension = self.embedder.dimension();
        let mut index = FlatL2Index::new(dimension, self.embedder.model_id());
        let batch_size = self.config.batch_size.max(1);

        for (batch_number, batch) in passages.chunks(batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(Error::Embedding(format!(
                    "embedder returned {} vectors for {} passages",
                    vectors.len(),
                    batch.len()
                )));
            }

            for vector in &vectors {
                index.add(vector)?;
            }

            debug!(
                batch = batch_number,
                embedded = index.len(),
                total = passages.len(),
                "Embedded batch"
            );
        }

        VectorIndex::new(index, Mapping::from_passages(passages))
    }

    /// Build the index and write both artifacts into `dir`
    pub async fn build_and_save(&self, passages: &[Passage], dir: &Path) -> Result<IndexingReport> {
        info!(
            passages = passages.len(),
            model = self.embedder.model_id(),
            "Building flat L2 index"
        );

        let index = self.build(passages).await?;
        index.save(dir)?;

        Ok(IndexingReport {
            passages_indexed: index.len(),
            dimension: index.index().dimension(),
            model_id: index.index().model_id().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_embedder::HashEmbedder;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![0.0; 4]).collect())
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_id(&self) -> &str {
            "short"
        }
    }

    fn passages() -> Vec<Passage> {
        ["Alpha beta.", "Gamma delta.", "Epsilon zeta.", "Eta theta.", "Iota kappa."]
            .iter()
            .enumerate()
            .map(|(i, t)| Passage::new(i as u64, *t))
            .collect()
    }

    #[tokio::test]
    async fn test_empty_corpus_rejected() {
        let indexer = Indexer::new(Arc::new(HashEmbedder::new()));
        assert!(matches!(indexer.build(&[]).await, Err(Error::EmptyCorpus)));
    }

    #[tokio::test]
    async fn test_slots_align_with_passages_across_batches() {
        let embedder = Arc::new(HashEmbedder::new());
        let indexer = Indexer::with_config(embedder.clone(), IndexingConfig { batch_size: 2 });
        let passages = passages();

        let index = indexer.build(&passages).await.unwrap();

        assert_eq!(index.len(), passages.len());
        for (slot, passage) in passages.iter().enumerate() {
            assert_eq!(index.mapping().get(slot), Some((passage.id, passage.text.as_str())));
            assert_eq!(
                index.index().vector(slot).unwrap(),
                embedder.embed_text(&passage.text).as_slice()
            );
        }
    }

    #[tokio::test]
    async fn test_embedder_count_mismatch() {
        let indexer = Indexer::new(Arc::new(ShortEmbedder));
        assert!(matches!(indexer.build(&passages()).await, Err(Error::Embedding(_))));
    }

    #[tokio::test]
    async fn test_build_and_save_replaces_artifacts() {
        let dir = TempDir::new().unwrap();
        let indexer = Indexer::new(Arc::new(HashEmbedder::new()));

        indexer.build_and_save(&passages(), dir.path()).await.unwrap();
        let report = indexer
            .build_and_save(&passages()[..2], dir.path())
            .await
            .unwrap();

        assert_eq!(
            report,
            IndexingReport {
                passages_indexed: 2,
                dimension: 384,
                model_id: "local-hash-384".to_string(),
            }
        );
        assert_eq!(VectorIndex::load(dir.path()).unwrap().len(), 2);
    }
}
