//! Conversation session and its transition function

use serde::Serialize;
use tracing::{debug, warn};

use docrag_core::{ConversationEntry, Error, RAGEngine, RAGQuery};

/// Where the shell is in a request/response cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShellState {
    Idle,
    AwaitingAnswer,
}

/// Conversation state of one interactive session.
///
/// The caller creates it when the session starts, threads it through
/// [`step`], and drops it when the session ends. Nothing is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    history: Vec<ConversationEntry>,
    state: ShellState,
    top_k: usize,
}

impl Session {
    pub fn new(top_k: usize) -> Self {
        Self {
            history: Vec::new(),
            state: ShellState::Idle,
            top_k,
        }
    }

    pub fn history(&self) -> &[ConversationEntry] {
        &self.history
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

/// A user action on the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellAction {
    Submit(String),
    Clear,
    /// Re-render the whole conversation
    History,
    /// Expand the sources of the n-th answer (1-based)
    Sources(usize),
    Help,
    Quit,
}

impl ShellAction {
    /// Interpret a line typed at the prompt
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let command = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let lower = command.to_lowercase();

        match lower.as_str() {
            "exit" | "quit" => return ShellAction::Quit,
            "clear" => return ShellAction::Clear,
            "history" => return ShellAction::History,
            "help" => return ShellAction::Help,
            _ => {}
        }

        if let Some(rest) = lower.strip_prefix("sources") {
            let rest = rest.trim();
            if rest.is_empty() {
                return ShellAction::Sources(0);
            }
            if let Ok(n) = rest.parse() {
                return ShellAction::Sources(n);
            }
        }

        ShellAction::Submit(input.to_string())
    }
}

/// What a transition produced, for the caller to render
#[derive(Debug)]
pub enum Outcome {
    /// A new entry was appended to the history
    Answered(ConversationEntry),
    /// The question failed; history is unchanged
    Failed(Error),
    Cleared,
    History,
    /// Sources of the requested answer (`index` is 1-based, 0 means latest)
    Sources {
        index: usize,
        entry: Option<ConversationEntry>,
    },
    Help,
    /// Blank input
    Ignored,
    Quit,
}

/// Apply one action to the session.
///
/// A submit runs retrieval and generation to completion before returning, so
/// only one request is ever in flight per session.
pub async fn step<R>(mut session: Session, action: ShellAction, engine: &R) -> (Session, Outcome)
where
    R: RAGEngine + ?Sized,
{
    match action {
        ShellAction::Submit(question) => {
            if question.trim().is_empty() {
                return (session, Outcome::Ignored);
            }

            session.state = ShellState::AwaitingAnswer;
            let query = RAGQuery::new(question.as_str(), session.top_k);
            let result = engine.answer(&query).await;
            session.state = ShellState::Idle;

            match result {
                Ok(result) => {
                    let entry = ConversationEntry {
                        question,
                        sources: result.source_texts(),
                        answer: result.answer,
                    };
                    session.history.push(entry.clone());
                    debug!(entries = session.history.len(), "Answer appended to history");
                    (session, Outcome::Answered(entry))
                }
                Err(e) => {
                    warn!(error = %e, "Question failed");
                    (session, Outcome::Failed(e))
                }
            }
        }
        ShellAction::Clear => {
            session.history.clear();
            session.state = ShellState::Idle;
            (session, Outcome::Cleared)
        }
        ShellAction::Sources(index) => {
            let entry = match index {
                0 => session.history.last().cloned(),
                n => session.history.get(n - 1).cloned(),
            };
            (session, Outcome::Sources { index, entry })
        }
        ShellAction::History => (session, Outcome::History),
        ShellAction::Help => (session, Outcome::Help),
        ShellAction::Quit => (session, Outcome::Quit),
    }
}

/// Whether a failed question leaves the shell usable.
///
/// Only generation failures are transient; anything else means the loaded
/// index or embedder is unusable and ends the session.
pub fn is_recoverable(error: &Error) -> bool {
    matches!(error, Error::Generation(_))
}
