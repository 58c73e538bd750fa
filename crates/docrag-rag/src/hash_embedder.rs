//! Offline feature-hashing embedder

use async_trait::async_trait;

use docrag_core::{Embedder, Result};

/// Deterministic bag-of-words embedder.
///
/// Words and word bigrams are hashed into a fixed number of buckets and the
/// vector is L2-normalised. It needs no model download or API key, which
/// makes it the default for offline indexing and for tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashEmbedder {
    pub const DEFAULT_DIMENSION: usize = 384;

    pub fn new() -> Self {
        Self::with_dimension(Self::DEFAULT_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_id: format!("local-hash-{}", dimension),
        }
    }

    /// Embed one text synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let normalized = text.to_lowercase();
        let words: Vec<&str> = normalized
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .collect();

        let mut embedding = vec![0.0f32; self.dimension];

        for word in &words {
            let hash = fnv1a(word.as_bytes());
            embedding[self.bucket(hash)] += 1.0;
            embedding[self.bucket(hash >> 24)] += 0.5;
        }

        for pair in words.windows(2) {
            let hash = fnv1a(format!("{} {}", pair[0], pair[1]).as_bytes());
            embedding[self.bucket(hash)] += 0.8;
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in embedding.iter_mut() {
                *value /= magnitude;
            }
        }

        embedding
    }

    fn bucket(&self, hash: u64) -> usize {
        (hash % self.dimension as u64) as usize
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Vectors are persisted, so the hash must not depend on the std hasher's
// unspecified algorithm.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}
