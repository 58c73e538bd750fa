//! Core traits and types for DocRAG
//!
//! This crate defines the types shared by every stage of the pipeline (passages,
//! retrieved passages, conversation entries), the error type, the configuration
//! layer, and the capability-facing traits for language models, embedders and
//! RAG engines. Keeping them here lets the shell and the binary be tested
//! against fakes.

pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod rag;
pub mod types;


pub use config::{EmbedderKind, PipelineConfig};
pub use embedding::Embedder;
pub use error::{Error, Result};
pub use llm::{GenerationConfig, GenerationResult, LLMProvider};
pub use rag::{RAGEngine, RAGQuery, RAGResult};
pub use types::*;
