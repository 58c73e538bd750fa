//! Tests for the shell session

#[cfg(test)]
mod session_tests {
    use crate::{
        format_entry, format_transcript, is_recoverable, step, BannerInfo, Outcome, Session,
        ShellAction, ShellState,
    };
    use async_trait::async_trait;
    use docrag_core::{Error, RAGEngine, RAGQuery, RAGResult, Result, RetrievedPassage};
    use insta::{assert_snapshot, assert_yaml_snapshot};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Engine over a fixed list of passages that can be told to fail
    struct FakeEngine {
        passages: Vec<&'static str>,
        fail: AtomicBool,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                passages: vec![
                    "The cat sat.",
                    "It was happy.",
                    "The dog barked.",
                    "It was loud.",
                ],
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl RAGEngine for FakeEngine {
        async fn retrieve(&self, query: &RAGQuery) -> Result<Vec<RetrievedPassage>> {
            Ok(self
                .passages
                .iter()
                .take(query.top_k)
                .enumerate()
                .map(|(i, t)| RetrievedPassage {
                    id: i as u64,
                    text: t.to_string(),
                    distance: i as f32,
                })
                .collect())
        }

        fn build_prompt(&self, query: &str, _passages: &[RetrievedPassage]) -> String {
            query.to_string()
        }

        async fn answer(&self, query: &RAGQuery) -> Result<RAGResult> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::Generation("service unavailable".to_string()));
            }
            let sources = self.retrieve(query).await?;
            Ok(RAGResult {
                answer: format!("Answer to: {}", query.query),
                sources,
                model_id: "fake".to_string(),
            })
        }

        fn stats(&self) -> serde_json::Value {
            json!({
                "passages": self.passages.len(),
                "embedding_model": "local-hash-384",
                "generation_model": "fake",
                "vector_store": "flat L2 (exact)",
            })
        }
    }

    fn submit(q: &str) -> ShellAction {
        ShellAction::Submit(q.to_string())
    }

    #[tokio::test]
    async fn test_submit_appends_one_entry() {
        let engine = FakeEngine::new();
        let session = Session::new(3);

        let (session, outcome) = step(session, submit("What did the dog do?"), &engine).await;

        assert!(matches!(outcome, Outcome::Answered(_)));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].sources.len(), 3);
        assert_eq!(session.state(), ShellState::Idle);
        assert_yaml_snapshot!(session.history()[0], @r###"
        ---
        question: What did the dog do?
        answer: "Answer to: What did the dog do?"
        sources:
          - The cat sat.
          - It was happy.
          - The dog barked.
        "###);
    }

    #[tokio::test]
    async fn test_clear_empties_history() {
        let engine = FakeEngine::new();
        let mut session = Session::new(2);
        for q in ["first?", "second?"] {
            let (next, _) = step(session, submit(q), &engine).await;
            session = next;
        }
        assert_eq!(session.history().len(), 2);

        let (session, outcome) = step(session, ShellAction::Clear, &engine).await;
        assert!(matches!(outcome, Outcome::Cleared));
        assert!(session.history().is_empty());
        assert_eq!(session.state(), ShellState::Idle);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_history() {
        let engine = FakeEngine::new();
        let (session, _) = step(Session::new(1), submit("first?"), &engine).await;

        engine.fail.store(true, Ordering::SeqCst);
        let (session, outcome) = step(session, submit("second?"), &engine).await;

        match outcome {
            Outcome::Failed(Error::Generation(msg)) => assert_eq!(msg, "service unavailable"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].question, "first?");
        assert_eq!(session.state(), ShellState::Idle);
    }

    #[tokio::test]
    async fn test_blank_submit_is_ignored() {
        let engine = FakeEngine::new();
        let (session, outcome) = step(Session::new(3), submit("   "), &engine).await;
        assert!(matches!(outcome, Outcome::Ignored));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_sources_lookup() {
        let engine = FakeEngine::new();
        let mut session = Session::new(1);
        for q in ["first?", "second?"] {
            let (next, _) = step(session, submit(q), &engine).await;
            session = next;
        }

        let (session, outcome) = step(session, ShellAction::Sources(1), &engine).await;
        match outcome {
            Outcome::Sources { index, entry: Some(entry) } => {
                assert_eq!(index, 1);
                assert_eq!(entry.question, "first?");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let (session, outcome) = step(session, ShellAction::Sources(0), &engine).await;
        match outcome {
            Outcome::Sources { entry: Some(entry), .. } => assert_eq!(entry.question, "second?"),
            other => panic!("unexpected outcome: {:?}", other),
        }

        let (_, outcome) = step(session, ShellAction::Sources(9), &engine).await;
        assert!(matches!(outcome, Outcome::Sources { entry: None, .. }));
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(ShellAction::parse("exit"), ShellAction::Quit);
        assert_eq!(ShellAction::parse("/quit"), ShellAction::Quit);
        assert_eq!(ShellAction::parse(" Clear "), ShellAction::Clear);
        assert_eq!(ShellAction::parse("help"), ShellAction::Help);
        assert_eq!(ShellAction::parse("/history"), ShellAction::History);
        assert_eq!(ShellAction::parse("sources"), ShellAction::Sources(0));
        assert_eq!(ShellAction::parse("/sources 2"), ShellAction::Sources(2));
        assert_eq!(
            ShellAction::parse("sources of income?"),
            submit("sources of income?")
        );
        assert_eq!(ShellAction::parse("Who barked?"), submit("Who barked?"));
    }

    #[test]
    fn test_banner_info_from_stats() {
        let info = BannerInfo::from_stats(&FakeEngine::new().stats());
        assert_eq!(info.passages, 4);
        assert_eq!(info.generation_model, "fake");
        assert_eq!(info.embedding_model, "local-hash-384");

        let empty = BannerInfo::from_stats(&json!({}));
        assert_eq!(empty.generation_model, "unknown");
        assert_eq!(empty.passages, 0);
    }

    #[tokio::test]
    async fn test_question_reaches_engine_verbatim() {
        let engine = FakeEngine::new();
        let (session, outcome) = step(Session::new(1), submit("  Who barked?\t"), &engine).await;

        match outcome {
            Outcome::Answered(entry) => assert_eq!(entry.answer, "Answer to:   Who barked?\t"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(session.history()[0].question, "  Who barked?\t");
    }

    #[tokio::test]
    async fn test_history_action_keeps_session() {
        let engine = FakeEngine::new();
        let (session, _) = step(Session::new(1), submit("first?"), &engine).await;
        let (session, outcome) = step(session, ShellAction::History, &engine).await;
        assert!(matches!(outcome, Outcome::History));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_only_generation_failures_are_recoverable() {
        assert!(is_recoverable(&Error::Generation("timeout".to_string())));
        assert!(!is_recoverable(&Error::Embedding("quota".to_string())));
        assert!(!is_recoverable(&Error::CorruptIndex("truncated".to_string())));
        assert!(!is_recoverable(&Error::EmptyCorpus));
    }

    #[tokio::test]
    async fn test_transcript_formatting() {
        colored::control::set_override(false);

        let engine = FakeEngine::new();
        let mut session = Session::new(2);
        for q in ["Who sat?", "Who barked?"] {
            let (next, _) = step(session, submit(q), &engine).await;
            session = next;
        }

        assert_snapshot!(format_transcript(&session), @r###"
        You: Who sat?
        Bot: Answer to: Who sat?
          [2 sources, type 'sources 1' to expand]

        You: Who barked?
        Bot: Answer to: Who barked?
          [2 sources, type 'sources 2' to expand]
        "###);

        assert_snapshot!(format_entry(2, &session.history()[1], true), @r###"
        You: Who barked?
        Bot: Answer to: Who barked?
        Sources for answer 2
          Source 1: The cat sat.
          Source 2: It was happy.
        "###);
    }
}
