//! Gemini configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

use docrag_core::{Error, Result};

/// Configuration for the Gemini clients
#[derive(Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub api_url: String,
    pub model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

impl GeminiConfig {
    pub const DEFAULT_API_URL: &'static str = "https://generativelanguage.googleapis.com/v1beta";
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";
    pub const DEFAULT_EMBEDDING_MODEL: &'static str = "text-embedding-004";
    pub const DEFAULT_EMBEDDING_DIMENSION: usize = 768;

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = Self::api_key_from_env().ok_or_else(|| {
            Error::MissingCredential(
                "GEMINI_API_KEY or GOOGLE_API_KEY environment variable not found".to_string(),
            )
        })?;
        Ok(Self::new(api_key).with_env_overrides())
    }

    /// The API key from `.env` or the process environment, if set and non-empty
    pub fn api_key_from_env() -> Option<String> {
        dotenvy::dotenv().ok();
        env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    /// Create configuration with an explicit key and default endpoints
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: Self::DEFAULT_API_URL.to_string(),
            model: Self::DEFAULT_MODEL.to_string(),
            embedding_model: Self::DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: Self::DEFAULT_EMBEDDING_DIMENSION,
        }
    }

    /// Apply the non-secret `GEMINI_*` settings from the environment
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("GEMINI_API_URL") {
            self.api_url = url;
        }
        if let Ok(model) = env::var("GEMINI_MODEL") {
            self.model = model;
        }
        if let Ok(model) = env::var("GEMINI_EMBEDDING_MODEL") {
            self.embedding_model = model;
        }
        if let Some(dimension) = env::var("GEMINI_EMBEDDING_DIMENSION")
            .ok()
            .and_then(|d| d.trim().parse().ok())
        {
            self.embedding_dimension = dimension;
        }
        self
    }

    pub(crate) fn ensure_key(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::MissingCredential("Gemini API key is empty".to_string()));
        }
        Ok(())
    }

    pub(crate) fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.api_url.trim_end_matches('/'),
            model.trim_start_matches("models/"),
            method
        )
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"[redacted]")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dimension", &self.embedding_dimension)
            .finish()
    }
}
