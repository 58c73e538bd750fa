//! Retrieval engine for DocRAG
//!
//! This crate turns a single document into passages, embeds them into an exact
//! flat L2 index persisted on disk, and answers questions by retrieving the
//! nearest passages and handing them to an [`LLMProvider`](docrag_core::LLMProvider).

mod chunker;
mod engine;
mod extractor;
mod generator;
mod hash_embedder;
mod index;
mod indexer;
mod prompt;
mod retriever;
mod store;


pub use chunker::{clean_text, split_sentences, Chunker, ChunkingConfig};
pub use engine::LocalRAGEngine;
pub use extractor::{
    discover_document, docx_supported, extract_text, resolve_document, DocumentFormat,
};
pub use generator::AnswerGenerator;
pub use hash_embedder::HashEmbedder;
pub use index::{FlatL2Index, Mapping, VectorIndex};
pub use indexer::{IndexingConfig, IndexingReport, Indexer};
pub use prompt::build_prompt;
pub use retriever::Retriever;
pub use store::{read_chunks, write_chunks};

// Re-export core types for convenience
pub use docrag_core::{
    Embedder, Error, LLMProvider, Passage, RAGEngine, RAGQuery, RAGResult, Result,
    RetrievedPassage,
};
