//! Snapshot tests for the Gemini clients

#[cfg(test)]
mod snapshot_tests {
    use crate::client::build_request;
    use crate::embedder::build_batch_request;
    use crate::{GeminiClient, GeminiConfig, GenerationConfig, LLMProvider};
    use insta::assert_yaml_snapshot;
    use std::time::Duration;

    #[test]
    fn test_config_snapshot_hides_key() {
        let config = GeminiConfig::new("secret_api_key");

        assert_yaml_snapshot!(config, @r###"
        ---
        api_url: "https://generativelanguage.googleapis.com/v1beta"
        model: gemini-2.0-flash
        embedding_model: text-embedding-004
        embedding_dimension: 768
        "###);
        assert!(!format!("{:?}", config).contains("secret_api_key"));
    }

    #[test]
    fn test_model_urls() {
        let mut config = GeminiConfig::new("k");
        config.api_url = "https://example.test/v1beta/".to_string();

        assert_eq!(
            config.model_url("gemini-2.0-flash", "generateContent"),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            config.model_url("models/text-embedding-004", "batchEmbedContents"),
            "https://example.test/v1beta/models/text-embedding-004:batchEmbedContents"
        );
    }

    #[test]
    fn test_generation_request_snapshot() {
        let config = GenerationConfig {
            model_id: "gemini-2.0-flash".to_string(),
            max_tokens: Some(512),
            temperature: Some(0.5),
            top_p: None,
            top_k: None,
            stop_sequences: Vec::new(),
            timeout: Duration::from_secs(30),
        };

        assert_yaml_snapshot!(build_request("Source 1: text", &config), @r###"
        ---
        contents:
          - role: user
            parts:
              - text: "Source 1: text"
        generationConfig:
          maxOutputTokens: 512
          temperature: 0.5
        "###);
    }

    #[test]
    fn test_default_request_leaves_limits_to_model() {
        let body = serde_json::to_value(build_request("q", &GenerationConfig::default())).unwrap();
        assert_eq!(body["generationConfig"], serde_json::json!({}));
    }

    #[test]
    fn test_embedding_request_snapshot() {
        let texts = vec!["first passage".to_string(), "second passage".to_string()];

        assert_yaml_snapshot!(build_batch_request("text-embedding-004", &texts), @r###"
        ---
        requests:
          - model: models/text-embedding-004
            content:
              parts:
                - text: first passage
          - model: models/text-embedding-004
            content:
              parts:
                - text: second passage
        "###);
    }

    #[test]
    fn test_model_selection() {
        let client = GeminiClient::new(GeminiConfig::new("k")).unwrap();
        assert_eq!(client.model_id(), "gemini-2.0-flash");

        let mut config = GeminiConfig::new("k");
        config.model = "gemini-1.5-pro".to_string();
        let client = GeminiClient::new(config).unwrap();
        assert_eq!(client.model_id(), "gemini-1.5-pro");
    }
}
