//! Interactive shell for DocRAG

mod session;
mod shell;
mod ui;

#[cfg(test)]
mod tests;

pub use session::{is_recoverable, step, Outcome, Session, ShellAction, ShellState};
pub use shell::run_interactive;
pub use ui::{
    display_banner, format_entry, format_sources, format_transcript, print_help, prompt_secret,
    read_line_with_history, render_entry, render_error, render_sources, render_transcript,
    BannerInfo,
};

// Re-export core types
pub use docrag_core::{Error, Result};
