//! Interactive question loop

use colored::*;
use tracing::info;

use docrag_core::{RAGEngine, Result};

use crate::session::{is_recoverable, step, Outcome, Session, ShellAction};
use crate::ui;

/// Run the shell until the user quits or input is closed.
///
/// Generation failures are reported and the loop continues. Any other error
/// ends the session and is returned to the caller.
pub async fn run_interactive<R>(engine: &R, mut session: Session) -> Result<Session>
where
    R: RAGEngine + ?Sized,
{
    ui::display_banner(&ui::BannerInfo::from_stats(&engine.stats()));

    let mut input_history = Vec::new();
    loop {
        let Some(line) = ui::read_line_with_history(&mut input_history)? else {
            break;
        };

        let action = ShellAction::parse(&line);
        if matches!(action, ShellAction::Submit(ref q) if !q.trim().is_empty()) {
            println!(
                "{}",
                format!("🔍 Searching the document (top {})...", session.top_k()).dimmed()
            );
        }

        let (next, outcome) = step(session, action, engine).await;
        session = next;

        match outcome {
            Outcome::Answered(entry) => {
                ui::render_entry(session.history().len(), &entry, false);
            }
            Outcome::Failed(e) if is_recoverable(&e) => ui::render_error(&e),
            Outcome::Failed(e) => return Err(e),
            Outcome::Cleared => {
                println!("{}", "History cleared".green());
            }
            Outcome::History => {
                if session.history().is_empty() {
                    println!("{}", "No questions asked yet".dimmed());
                }
                ui::render_transcript(&session);
            }
            Outcome::Sources { index, entry } => match entry {
                Some(entry) => {
                    let number = if index == 0 { session.history().len() } else { index };
                    ui::render_sources(number, &entry);
                }
                None => println!("{}", "No such answer in the history".yellow()),
            },
            Outcome::Help => ui::print_help(),
            Outcome::Ignored => {}
            Outcome::Quit => break,
        }
    }

    info!(exchanges = session.history().len(), "Shell session ended");
    println!("{}", "👋 Goodbye!".cyan());
    Ok(session)
}
