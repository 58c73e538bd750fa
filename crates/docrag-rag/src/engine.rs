//! RAG engine implementation

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use docrag_core::{
    Embedder, LLMProvider, RAGEngine, RAGQuery, RAGResult, Result, RetrievedPassage,
};

use crate::generator::AnswerGenerator;
use crate::index::VectorIndex;
use crate::prompt::build_prompt;
use crate::retriever::Retriever;

/// Local RAG engine: a loaded flat index plus a language model.
///
/// Index and embedder are loaded once and reused for every question.
pub struct LocalRAGEngine<L: LLMProvider> {
    retriever: Retriever,
    generator: AnswerGenerator<L>,
}

impl<L: LLMProvider> LocalRAGEngine<L> {
    /// Create a new local RAG engine
    pub fn new(retriever: Retriever, generator: AnswerGenerator<L>) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Wire a loaded index to `embedder` and `llm`.
    ///
    /// Fails with `ModelMismatch` if `embedder` did not build the index.
    pub fn from_index(index: VectorIndex, embedder: Arc<dyn Embedder>, llm: L) -> Result<Self> {
        let retriever = Retriever::new(embedder, Arc::new(index))?;
        Ok(Self::new(retriever, AnswerGenerator::new(llm)))
    }
}

#[async_trait]
impl<L: LLMProvider + 'static> RAGEngine for LocalRAGEngine<L> {
    async fn retrieve(&self, query: &RAGQuery) -> Result<Vec<RetrievedPassage>> {
        self.retriever.retrieve(&query.query, query.top_k).await
    }

    fn build_prompt(&self, query: &str, passages: &[RetrievedPassage]) -> String {
        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        build_prompt(query, &texts)
    }

    async fn answer(&self, query: &RAGQuery) -> Result<RAGResult> {
        let sources = self.retrieve(query).await?;
        let prompt = self.build_prompt(&query.query, &sources);
        let answer = self.generator.complete(&prompt).await?;

        Ok(RAGResult {
            answer,
            sources,
            model_id: self.generator.model_id().to_string(),
        })
    }

    fn stats(&self) -> serde_json::Value {
        let index = self.retriever.index();
        json!({
            "passages": index.len(),
            "dimension": index.index().dimension(),
            "embedding_model": index.index().model_id(),
            "generation_model": self.generator.model_id(),
            "vector_store": "flat L2 (exact)",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash_embedder::HashEmbedder;
    use crate::indexer::Indexer;
    use docrag_core::{Error, GenerationConfig, GenerationResult, Passage};
    use tempfile::TempDir;

    struct EchoLlm;

    #[async_trait]
    impl LLMProvider for EchoLlm {
        async fn generate(&self, prompt: &str) -> Result<GenerationResult> {
            self.generate_with_config(prompt, &GenerationConfig::default()).await
        }

        async fn generate_with_config(
            &self,
            prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<GenerationResult> {
            let sources = prompt.matches("Source ").count() - 2;
            Ok(GenerationResult {
                text: format!("answered from {} sources", sources),
                model_id: "echo".to_string(),
                tokens_used: None,
            })
        }

        fn model_id(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_engine_loads_index_and_answers() {
        let dir = TempDir::new().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
        let passages: Vec<Passage> = [
            "Refunds are issued within 14 days.",
            "Shipping is free above fifty euros.",
            "Support is available on weekdays.",
            "Accounts can be closed at any time.",
        ]
        .iter()
        .enumerate()
        .map(|(i, t)| Passage::new(i as u64, *t))
        .collect();
        Indexer::new(embedder.clone())
            .build_and_save(&passages, dir.path())
            .await
            .unwrap();

        let index = VectorIndex::load(dir.path()).unwrap();
        let engine = LocalRAGEngine::from_index(index, embedder, EchoLlm).unwrap();
        let result = engine
            .answer(&RAGQuery::new("When are refunds issued?", 3))
            .await
            .unwrap();

        assert_eq!(result.answer, "answered from 3 sources");
        assert_eq!(result.sources.len(), 3);
        assert_eq!(result.sources[0].id, 0);
        assert_eq!(result.model_id, "echo");
        assert_eq!(engine.stats()["passages"], 4);
    }

    #[tokio::test]
    async fn test_engine_rejects_foreign_embedder() {
        let dir = TempDir::new().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new());
        Indexer::new(embedder)
            .build_and_save(&[Passage::new(0, "Only passage.")], dir.path())
            .await
            .unwrap();

        let index = VectorIndex::load(dir.path()).unwrap();
        let other: Arc<dyn Embedder> = Arc::new(HashEmbedder::with_dimension(16));
        assert!(matches!(
            LocalRAGEngine::from_index(index, other, EchoLlm),
            Err(Error::ModelMismatch { .. })
        ));
    }
}
