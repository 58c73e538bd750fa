//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::{Error, Result};

/// Which embedder builds and queries the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Offline feature-hashing embedder
    Local,
    /// Gemini embedding API
    Gemini,
}

impl FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "hash" => Ok(EmbedderKind::Local),
            "gemini" | "google" => Ok(EmbedderKind::Gemini),
            other => Err(Error::Configuration(format!(
                "unknown embedder '{}' (expected 'local' or 'gemini')",
                other
            ))),
        }
    }
}

impl fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbedderKind::Local => write!(f, "local"),
            EmbedderKind::Gemini => write!(f, "gemini"),
        }
    }
}

/// Locations and tunables for the ingest, index and query stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub chunks_path: PathBuf,
    pub vectordb_dir: PathBuf,
    pub min_words: usize,
    pub max_words: usize,
    pub top_k: usize,
    pub embedder: EmbedderKind,
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            chunks_path: PathBuf::from("chunks/chunks.jsonl"),
            vectordb_dir: PathBuf::from("vectordb"),
            min_words: 100,
            max_words: 300,
            top_k: 3,
            embedder: EmbedderKind::Local,
            batch_size: 32,
        }
    }
}

impl PipelineConfig {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            data_dir: lookup("DOCRAG_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            chunks_path: lookup("DOCRAG_CHUNKS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.chunks_path),
            vectordb_dir: lookup("DOCRAG_VECTORDB_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.vectordb_dir),
            min_words: parse_number(&lookup, "DOCRAG_MIN_WORDS", defaults.min_words)?,
            max_words: parse_number(&lookup, "DOCRAG_MAX_WORDS", defaults.max_words)?,
            top_k: parse_number(&lookup, "DOCRAG_TOP_K", defaults.top_k)?,
            embedder: match lookup("DOCRAG_EMBEDDER") {
                Some(value) => value.parse()?,
                None => defaults.embedder,
            },
            batch_size: parse_number(&lookup, "DOCRAG_BATCH_SIZE", defaults.batch_size)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if self.min_words == 0 {
            return Err(Error::Configuration("min_words must be at least 1".to_string()));
        }
        if self.max_words < self.min_words {
            return Err(Error::Configuration(format!(
                "max_words ({}) must not be smaller than min_words ({})",
                self.max_words, self.min_words
            )));
        }
        if self.top_k == 0 {
            return Err(Error::Configuration("top_k must be at least 1".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::Configuration("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Path of the binary flat index inside the vector directory
    pub fn index_path(&self) -> PathBuf {
        self.vectordb_dir.join(INDEX_FILE_NAME)
    }

    /// Path of the id/text mapping inside the vector directory
    pub fn mapping_path(&self) -> PathBuf {
        self.vectordb_dir.join(MAPPING_FILE_NAME)
    }
}

/// File name of the binary similarity structure
pub const INDEX_FILE_NAME: &str = "flat_l2.index";

/// File name of the positional id/text mapping
pub const MAPPING_FILE_NAME: &str = "chunk_mapping.json";

fn parse_number<F>(lookup: &F, key: &str, default: usize) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::Configuration(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
        None => Ok(default),
    }
}
