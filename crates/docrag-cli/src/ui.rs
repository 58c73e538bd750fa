//! Terminal rendering and line input for the shell

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use serde_json::Value;
use std::io::{self, IsTerminal, Write};

use docrag_core::{ConversationEntry, Error, Result};

use crate::Session;

const PROMPT: &str = "ask>";

/// What the banner shows about the loaded pipeline
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerInfo {
    pub generation_model: String,
    pub embedding_model: String,
    pub vector_store: String,
    pub passages: usize,
}

impl BannerInfo {
    /// Read the banner fields out of an engine's `stats()` value
    pub fn from_stats(stats: &Value) -> Self {
        let field = |key: &str| {
            stats
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        };

        Self {
            generation_model: field("generation_model"),
            embedding_model: field("embedding_model"),
            vector_store: field("vector_store"),
            passages: stats.get("passages").and_then(Value::as_u64).unwrap_or(0) as usize,
        }
    }

    fn lines(&self) -> Vec<String> {
        vec![
            "Ask questions about your document".to_string(),
            String::new(),
            format!("Model:      {}", self.generation_model),
            format!("Embeddings: {}", self.embedding_model),
            format!("Index:      {} ({} passages)", self.vector_store, self.passages),
            String::new(),
            format!("v{}", env!("CARGO_PKG_VERSION")),
        ]
    }
}

/// Display startup banner
pub fn display_banner(info: &BannerInfo) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let lines = info.lines();
    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let banner_width = (widest + 6).max(40).min(terminal_width.saturating_sub(4).max(40));

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());

    let title = "DocRAG";
    println!(
        "{}{}{}{}",
        "│  ".blue(),
        title.blue().bold(),
        " ".repeat(banner_width.saturating_sub(title.len() + 4)),
        "│".blue()
    );
    println!("{}", empty_line.blue());

    for line in lines {
        if line.is_empty() {
            println!("{}", empty_line.blue());
            continue;
        }
        let line: String = line.chars().take(banner_width - 4).collect();
        let padding = " ".repeat(banner_width - 4 - line.chars().count());
        let content = if line.starts_with('v') {
            format!("│  {}{}│", line.dimmed(), padding)
        } else {
            format!("│  {}{}│", line, padding)
        };
        println!("{}", content.blue());
    }

    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "Tip: type a question, or 'help' for commands".dimmed()
    );
    println!();
}

fn redraw(input: &str, previous_len: usize) -> io::Result<()> {
    let clear = " ".repeat(previous_len.saturating_sub(input.chars().count()));
    print!("\r{} {}{}\r{} {}", PROMPT.green().bold(), input, clear, PROMPT.green().bold(), input);
    io::stdout().flush()
}

/// Read one line with history navigation.
///
/// Returns `None` when input is closed (EOF on a pipe, Ctrl-D or Ctrl-C on a
/// terminal). Esc abandons the current line and yields an empty string.
pub fn read_line_with_history(history: &mut Vec<String>) -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim_end_matches(['\n', '\r']).to_string();
        if !input.trim().is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    enable_raw_mode()?;
    let result = read_raw_line(history);
    disable_raw_mode()?;
    println!();
    result
}

fn read_raw_line(history: &mut Vec<String>) -> Result<Option<String>> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;

    print!("{} ", PROMPT.green().bold());
    io::stdout().flush()?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        let previous_len = input.chars().count();

        match key_event.code {
            KeyCode::Char('c') | KeyCode::Char('d')
                if key_event.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                return Ok(None);
            }
            KeyCode::Enter => {
                if !input.trim().is_empty() {
                    history.push(input.clone());
                }
                return Ok(Some(input));
            }
            KeyCode::Char(c) => {
                input.push(c);
                redraw(&input, previous_len)?;
            }
            KeyCode::Backspace => {
                if input.pop().is_some() {
                    redraw(&input, previous_len)?;
                }
            }
            KeyCode::Up => {
                if !history.is_empty() {
                    let new_index = match history_index {
                        None => history.len() - 1,
                        Some(idx) if idx > 0 => idx - 1,
                        Some(idx) => idx,
                    };
                    history_index = Some(new_index);
                    input = history[new_index].clone();
                    redraw(&input, previous_len)?;
                }
            }
            KeyCode::Down => {
                if let Some(idx) = history_index {
                    if idx + 1 < history.len() {
                        history_index = Some(idx + 1);
                        input = history[idx + 1].clone();
                    } else {
                        history_index = None;
                        input.clear();
                    }
                    redraw(&input, previous_len)?;
                }
            }
            KeyCode::Esc => return Ok(Some(String::new())),
            _ => {}
        }
    }
}

/// Prompt for a secret without echoing it.
///
/// Returns `None` if the user enters nothing or cancels.
pub fn prompt_secret(label: &str) -> Result<Option<String>> {
    print!("{} {} ", "🔑".yellow(), label.bold());
    io::stdout().flush()?;

    let secret = if io::stdin().is_terminal() {
        enable_raw_mode()?;
        let result = read_masked();
        disable_raw_mode()?;
        println!();
        result?
    } else {
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Some(line.trim().to_string())
    };

    Ok(secret.filter(|s| !s.is_empty()))
}

fn read_masked() -> Result<Option<String>> {
    let mut secret = String::new();
    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        match key_event.code {
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(None);
            }
            KeyCode::Enter => return Ok(Some(secret.trim().to_string())),
            KeyCode::Esc => return Ok(None),
            KeyCode::Char(c) => {
                secret.push(c);
                print!("*");
                io::stdout().flush()?;
            }
            KeyCode::Backspace => {
                if secret.pop().is_some() {
                    print!("\u{8} \u{8}");
                    io::stdout().flush()?;
                }
            }
            _ => {}
        }
    }
}

/// Format one exchange; sources stay collapsed unless `expanded`
pub fn format_entry(number: usize, entry: &ConversationEntry, expanded: bool) -> String {
    let mut out = format!(
        "{} {}\n{} {}\n",
        "You:".cyan().bold(),
        entry.question,
        "Bot:".green().bold(),
        entry.answer
    );

    if expanded {
        out.push_str(&format_sources(number, entry));
    } else if !entry.sources.is_empty() {
        let hint = format!(
            "  [{} sources, type 'sources {}' to expand]",
            entry.sources.len(),
            number
        );
        out.push_str(&format!("{}\n", hint.dimmed()));
    }
    out
}

/// Format the source passages of one exchange
pub fn format_sources(number: usize, entry: &ConversationEntry) -> String {
    let mut out = format!("{} {}\n", "Sources for answer".bold(), number.to_string().bold());
    if entry.sources.is_empty() {
        out.push_str(&format!("  {}\n", "(none)".dimmed()));
    }
    for (i, source) in entry.sources.iter().enumerate() {
        out.push_str(&format!("  {} {}\n", format!("Source {}:", i + 1).yellow(), source));
    }
    out
}

/// Format the whole history, oldest first
pub fn format_transcript(session: &Session) -> String {
    session
        .history()
        .iter()
        .enumerate()
        .map(|(i, entry)| format_entry(i + 1, entry, false))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_entry(number: usize, entry: &ConversationEntry, expanded: bool) {
    println!("{}", format_entry(number, entry, expanded));
}

pub fn render_sources(number: usize, entry: &ConversationEntry) {
    print!("{}", format_sources(number, entry));
}

pub fn render_transcript(session: &Session) {
    println!("{}", format_transcript(session));
}

/// Render an error without leaving the shell
pub fn render_error(error: &Error) {
    let hint = match error {
        Error::Generation(_) => Some("the question was not recorded; try again"),
        _ => None,
    };

    eprintln!("{} {}", "❌ Error:".red().bold(), error);
    if let Some(hint) = hint {
        eprintln!("   {}", hint.dimmed());
    }
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask a question about the document", "<question>".green());
    println!("  {} - Show the sources of answer n (latest if omitted)", "sources [n]".green());
    println!("  {} - Show the conversation so far", "history".green());
    println!("  {} - Clear the conversation history", "clear".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the shell", "exit/quit".green());
    println!();
    println!("{}", "Navigation:".bold());
    println!("  ↑/↓ to recall previous questions, Esc to discard the current line");
}
