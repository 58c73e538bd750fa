//! Gemini embedding client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use docrag_core::{Embedder, Error, Result};

use crate::client::describe_api_error;
use crate::config::GeminiConfig;

/// Gemini rejects `batchEmbedContents` calls with more requests than this
const MAX_BATCH: usize = 100;

/// Embedder backed by the Gemini `batchEmbedContents` endpoint
pub struct GeminiEmbedder {
    config: GeminiConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchEmbedRequest<'a> {
    pub requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbedRequest<'a> {
    pub model: String,
    pub content: EmbedContent<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbedContent<'a> {
    pub parts: Vec<EmbedPart<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmbedPart<'a> {
    pub text: &'a str,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

pub(crate) fn build_batch_request<'a>(model: &str, texts: &'a [String]) -> BatchEmbedRequest<'a> {
    let model = format!("models/{}", model.trim_start_matches("models/"));
    BatchEmbedRequest {
        requests: texts
            .iter()
            .map(|text| EmbedRequest {
                model: model.clone(),
                content: EmbedContent {
                    parts: vec![EmbedPart { text }],
                },
            })
            .collect(),
    }
}

pub(crate) fn parse_embeddings(body: &str, expected: usize, dimension: usize) -> Result<Vec<Vec<f32>>> {
    let response: BatchEmbedResponse = serde_json::from_str(body)
        .map_err(|e| Error::Embedding(format!("malformed Gemini embedding response: {}", e)))?;

    if response.embeddings.len() != expected {
        return Err(Error::Embedding(format!(
            "Gemini returned {} embeddings for {} texts",
            response.embeddings.len(),
            expected
        )));
    }

    response
        .embeddings
        .into_iter()
        .map(|embedding| {
            if embedding.values.len() != dimension {
                return Err(Error::Embedding(format!(
                    "Gemini returned a {}-dimensional embedding, expected {}",
                    embedding.values.len(),
                    dimension
                )));
            }
            Ok(embedding.values)
        })
        .collect()
}

impl GeminiEmbedder {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.ensure_key()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Embedding(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    async fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self
            .config
            .model_url(&self.config.embedding_model, "batchEmbedContents");
        let request_body = build_batch_request(&self.config.embedding_model, texts);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Embedding(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Embedding(describe_api_error(status, &body)));
        }

        parse_embeddings(&body, texts.len(), self.config.embedding_dimension)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(MAX_BATCH) {
            vectors.extend(self.embed_chunk(chunk).await?);
            debug!(embedded = vectors.len(), total = texts.len(), "Gemini embeddings received");
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dimension
    }

    fn model_id(&self) -> &str {
        &self.config.embedding_model
    }
}
