//! Answer generation through an LLM provider

use tracing::debug;

use docrag_core::{GenerationConfig, LLMProvider, Result};

/// Sends a grounded prompt to the model and returns its answer
pub struct AnswerGenerator<L: LLMProvider> {
    llm: L,
    config: GenerationConfig,
}

impl<L: LLMProvider> AnswerGenerator<L> {
    /// Create a generator using the provider's own model
    pub fn new(llm: L) -> Self {
        let config = GenerationConfig {
            model_id: llm.model_id().to_string(),
            ..Default::default()
        };
        Self { llm, config }
    }

    /// Create with an explicit generation configuration
    pub fn with_config(llm: L, config: GenerationConfig) -> Self {
        Self { llm, config }
    }

    pub fn model_id(&self) -> &str {
        &self.config.model_id
    }

    /// Send `prompt` to the model and return its raw text.
    ///
    /// Provider failures propagate unchanged.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(prompt_chars = prompt.len(), model = %self.config.model_id, "Requesting answer");

        let result = self.llm.generate_with_config(prompt, &self.config).await?;
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::build_prompt;
    use async_trait::async_trait;
    use docrag_core::{Error, GenerationResult};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl LLMProvider for RecordingLlm {
        async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
            self.generate_with_config(prompt, &GenerationConfig::default()).await
        }

        async fn generate_with_config(
            &self,
            prompt: &str,
            config: &GenerationConfig,
        ) -> Result<GenerationResult> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                return Err(Error::Generation("quota exceeded".to_string()));
            }
            Ok(GenerationResult {
                text: "It was the dog (Source 2).".to_string(),
                model_id: config.model_id.clone(),
                tokens_used: None,
            })
        }

        fn model_id(&self) -> &str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_generate_sends_grounded_prompt() {
        let generator = AnswerGenerator::new(RecordingLlm::default());
        let prompt = build_prompt("Who barked?", &["The cat sat.", "The dog barked."]);
        let answer = generator.complete(&prompt).await.unwrap();

        assert_eq!(answer, "It was the dog (Source 2).");
        assert_eq!(generator.model_id(), "recording");
        let prompts = generator.llm.prompts.lock().unwrap();
        assert_eq!(prompts[0], prompt);
    }

    #[tokio::test]
    async fn test_generation_error_propagates() {
        let generator = AnswerGenerator::new(RecordingLlm {
            fail: true,
            ..Default::default()
        });
        let result = generator.complete("Who barked?").await;
        assert!(matches!(result, Err(Error::Generation(_))));
    }
}
