//! Google Gemini integration for DocRAG
//!
//! This crate provides the Gemini implementation of the `LLMProvider` trait
//! and a Gemini-backed `Embedder`.

mod client;
mod config;
mod embedder;

#[cfg(test)]
mod tests;

pub use client::GeminiClient;
pub use config::GeminiConfig;
pub use embedder::GeminiEmbedder;

// Re-export core types for convenience
pub use docrag_core::{
    Embedder, Error, GenerationConfig, GenerationResult, LLMProvider, Result,
};
