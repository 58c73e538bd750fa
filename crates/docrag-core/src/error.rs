//! Error types for DocRAG

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the DocRAG pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Ambiguous document: found {} candidates ({}); pass --document to pick one", .0.len(), display_paths(.0))]
    AmbiguousDocument(Vec<PathBuf>),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Empty corpus: no passages to index")]
    EmptyCorpus,

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index not found at {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    #[error("Embedding model mismatch: index was built with {index} ({index_dim} dims), query embedder is {query} ({query_dim} dims)")]
    ModelMismatch {
        index: String,
        index_dim: usize,
        query: String,
        query_dim: usize,
    },

    #[error("Chunk store not found at {}", .0.display())]
    ChunkStoreNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
