//! Terminal rendering and the interactive chat loop.

use anyhow::Result;
use pdfchat_chat::{Answer, ChatSession};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::error;

const PROMPT: &str = "pdfchat> ";
const EXCERPT_CHARS: usize = 160;

/// What the user typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Question(String),
    Clear,
    ToggleSources,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

/// Classify one line of input. Lines starting with `/` are commands.
pub fn parse_line(line: &str) -> ReplInput {
    let line = line.trim();
    if line.is_empty() {
        return ReplInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ReplInput::Question(line.to_string());
    };
    match command.trim().to_ascii_lowercase().as_str() {
        "clear" | "reset" => ReplInput::Clear,
        "sources" => ReplInput::ToggleSources,
        "help" | "?" => ReplInput::Help,
        "quit" | "exit" | "q" => ReplInput::Quit,
        _ => ReplInput::Unknown(line.to_string()),
    }
}

/// First `max_chars` characters of `text` on one line, with an ellipsis if cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

/// Render an answer for the terminal, optionally followed by numbered sources.
pub fn render_answer(answer: &Answer, show_sources: bool) -> String {
    let mut out = answer.text.trim().to_string();
    if show_sources && !answer.sources.is_empty() {
        out.push_str("\n\nSources:");
        for (i, source) in answer.sources.iter().enumerate() {
            out.push_str(&format!(
                "\n  [{}] {} p.{} (distance {:.3}): {}",
                i + 1,
                source.chunk.source,
                source.chunk.page + 1,
                source.distance,
                excerpt(&source.chunk.text, EXCERPT_CHARS)
            ));
        }
    }
    out
}

fn print_help() {
    println!("Type a question about the document, or one of:");
    println!("  /clear    forget the conversation so far");
    println!("  /sources  toggle source excerpts under answers");
    println!("  /quit     leave");
}

/// Read questions until `/quit`, Ctrl-C or Ctrl-D.
///
/// Errors from a single question are printed and the loop continues.
pub async fn run_repl(mut session: ChatSession, mut show_sources: bool) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask a question about the document. /help lists commands.");

    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match parse_line(&line) {
            ReplInput::Empty => continue,
            ReplInput::Quit => break,
            ReplInput::Help => print_help(),
            ReplInput::Clear => {
                session.clear_history();
                println!("Conversation cleared.");
            }
            ReplInput::ToggleSources => {
                show_sources = !show_sources;
                println!("Sources {}.", if show_sources { "on" } else { "off" });
            }
            ReplInput::Unknown(command) => println!("Unknown command {command}. Try /help."),
            ReplInput::Question(question) => {
                let _ = editor.add_history_entry(question.as_str());
                match session.ask(&question).await {
                    Ok(Some(answer)) => println!("{}\n", render_answer(&answer, show_sources)),
                    Ok(None) => {}
                    Err(e) => {
                        error!(error = %e, "question failed");
                        eprintln!("Error: {e}");
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pdfchat_rag::{Chunk, SearchResult};

    use super::*;

    #[test]
    fn commands_and_questions_are_told_apart() {
        assert_eq!(parse_line("  "), ReplInput::Empty);
        assert_eq!(parse_line("/CLEAR"), ReplInput::Clear);
        assert_eq!(parse_line("/sources"), ReplInput::ToggleSources);
        assert_eq!(parse_line("/exit"), ReplInput::Quit);
        assert_eq!(parse_line(" Where is Nepal? "), ReplInput::Question("Where is Nepal?".into()));
        assert_eq!(parse_line("/frobnicate"), ReplInput::Unknown("/frobnicate".into()));
    }

    #[test]
    fn excerpts_are_flattened_and_cut_on_char_boundaries() {
        assert_eq!(excerpt("a\n\nb   c", 10), "a b c");
        assert_eq!(excerpt("नेपाल देश", 3), "नेप…");
    }

    #[test]
    fn sources_are_numbered_with_one_based_pages() {
        let answer = Answer {
            text: "South Asia.\n".to_string(),
            sources: vec![SearchResult {
                chunk: Chunk {
                    id: "atlas_0_0".into(),
                    text: "Nepal is a country\nin South Asia.".into(),
                    source: "atlas.pdf".into(),
                    page: 0,
                    position: 0,
                    start_index: 0,
                    metadata: HashMap::new(),
                },
                distance: 0.25,
                rank: 0,
            }],
            standalone_question: None,
        };

        assert_eq!(render_answer(&answer, false), "South Asia.");
        assert_eq!(
            render_answer(&answer, true),
            "South Asia.\n\nSources:\n  [1] atlas.pdf p.1 (distance 0.250): Nepal is a country in South Asia."
        );
    }
}
