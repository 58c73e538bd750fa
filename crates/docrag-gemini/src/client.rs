//! Gemini generation client implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use docrag_core::{Error, GenerationConfig, GenerationResult, LLMProvider, Result};

use crate::config::GeminiConfig;

/// Gemini `generateContent` client
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest<'a> {
    pub contents: Vec<Content<'a>>,
    pub generation_config: GenerationParams,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content<'a> {
    pub role: &'a str,
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part<'a> {
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u32>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
    status: Option<String>,
}

/// Build the JSON body for a single-turn generation request
pub(crate) fn build_request<'a>(prompt: &'a str, config: &GenerationConfig) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationParams {
            max_output_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            stop_sequences: config.stop_sequences.clone(),
        },
    }
}

/// Extract the generated text and token usage from a successful response body
pub(crate) fn parse_generation(body: &str) -> Result<(String, Option<u32>)> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| Error::Generation(format!("malformed Gemini response: {}", e)))?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::Generation(format!("prompt blocked by Gemini: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Generation("Gemini returned no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::Generation(format!(
            "empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    let tokens = response.usage_metadata.and_then(|u| u.total_token_count);
    Ok((text, tokens))
}

/// Human-readable description of a failed API call
pub(crate) fn describe_api_error(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => format!(
            "Gemini API request failed with status {} ({}): {}",
            status,
            envelope.error.status.as_deref().unwrap_or("UNKNOWN"),
            envelope.error.message
        ),
        Err(_) => format!("Gemini API request failed with status {}: {}", status, body.trim()),
    }
}

impl GeminiClient {
    /// Create a new Gemini client from configuration
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.ensure_key()?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| Error::Generation(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new Gemini client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Perform the actual generation request
    async fn perform_generation(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<(String, Option<u32>)> {
        let url = self.config.model_url(&config.model_id, "generateContent");
        let request_body = build_request(prompt, config);

        debug!(model = %config.model_id, prompt_chars = prompt.len(), "Sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Generation(describe_api_error(status, &body)));
        }

        parse_generation(&body)
    }
}

#[async_trait]
impl LLMProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
        let config = GenerationConfig {
            model_id: self.config.model.clone(),
            ..Default::default()
        };
        self.generate_with_config(prompt, &config).await
    }

    async fn generate_with_config(
        &self,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let generation_future = self.perform_generation(prompt, config);

        let (text, tokens_used) = match timeout(config.timeout, generation_future).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Generation(format!(
                    "request timed out after {}s",
                    config.timeout.as_secs()
                )))
            }
        };

        Ok(GenerationResult {
            text,
            model_id: config.model_id.clone(),
            tokens_used,
        })
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_joins_candidate_parts() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "The dog barked "}, {"text": "(Source 2).\n"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 6, "totalTokenCount": 46}
        }"#;

        let (text, tokens) = parse_generation(body).unwrap();
        assert_eq!(text, "The dog barked (Source 2).\n");
        assert_eq!(tokens, Some(46));
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        match parse_generation(body) {
            Err(Error::Generation(message)) => assert!(message.contains("SAFETY")),
            other => panic!("expected generation error, got {:?}", other.map(|r| r.0)),
        }
    }

    #[test]
    fn test_parse_empty_candidates() {
        assert!(matches!(parse_generation(r#"{"candidates": []}"#), Err(Error::Generation(_))));
        assert!(matches!(
            parse_generation(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#),
            Err(Error::Generation(_))
        ));
        assert!(matches!(parse_generation("<html>"), Err(Error::Generation(_))));
    }

    #[test]
    fn test_describe_api_error() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            describe_api_error(StatusCode::TOO_MANY_REQUESTS, body),
            "Gemini API request failed with status 429 Too Many Requests (RESOURCE_EXHAUSTED): Quota exceeded"
        );
        assert_eq!(
            describe_api_error(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "Gemini API request failed with status 502 Bad Gateway: upstream down"
        );
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            GeminiClient::new(GeminiConfig::new("  ")),
            Err(Error::MissingCredential(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_generation_error() {
        let mut config = GeminiConfig::new("test_key");
        config.api_url = "http://127.0.0.1:9".to_string();
        let client = GeminiClient::new(config).unwrap();

        let result = client.generate("hello").await;
        assert!(matches!(result, Err(Error::Generation(_))));
    }
}
