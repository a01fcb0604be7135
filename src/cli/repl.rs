//! Interactive chat REPL.
//!
//! A [`rustyline`] loop that feeds each line to the agent as one turn.
//! Readline history is persisted to the cache directory between runs.

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::{Behavior, DefaultEditor};

use super::run_turn_interruptible;
use crate::agent::Agent;
use crate::config::Config;
use crate::constants::HISTORY_FILENAME;
use crate::context::with_context;
use crate::output::{Renderer, StdoutRenderer};

/// Runs the REPL until `exit`, `quit` or Ctrl+D.
///
/// `initial` is context gathered before the loop started (files, piped
/// input). With history retention it is added to the conversation once;
/// otherwise it is prefixed to every query, since each turn forgets the last.
///
/// # Readline behavior
///
/// - **Ctrl+C**: cancels current input (or the running turn), stays in REPL
/// - **Ctrl+D**: exits cleanly
pub async fn run(
    agent: &mut Agent,
    renderer: &mut StdoutRenderer,
    initial: String,
    retain: bool,
) -> Result<()> {
    println!("{}", "Interactive Mode. Type 'exit' to quit.".bold().cyan());

    let per_query_context = if retain && !initial.is_empty() {
        agent.add_context(&initial);
        renderer.info("Context added to conversation memory.");
        None
    } else if initial.is_empty() {
        None
    } else {
        Some(initial)
    };

    // Piped stdin was read as initial context; prompt on the terminal.
    let rl_config = rustyline::Config::builder()
        .behavior(Behavior::PreferTerm)
        .build();
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let history_path = Config::cache_dir()?.join(HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        match rl.readline(&format!("{} ", ">".green().bold())) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if matches!(line, "exit" | "quit") {
                    break;
                }
                let _ = rl.add_history_entry(line);

                if line.starts_with('/') {
                    command(line, agent, renderer);
                    continue;
                }

                let prompt = match &per_query_context {
                    Some(context) => with_context(context, line),
                    None => line.to_string(),
                };
                if let Err(err) = run_turn_interruptible(agent, &prompt, renderer).await {
                    renderer.error(&format!("{err:#}"));
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                renderer.error(&err.to_string());
                break;
            }
        }
    }
    println!("{}", "goodbye.".dimmed());

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Handles a `/command` line.
fn command(line: &str, agent: &mut Agent, renderer: &mut dyn Renderer) {
    match line {
        "/tools" => {
            let names = agent.tools().names();
            if names.is_empty() {
                renderer.info("No tools loaded.");
            } else {
                renderer.info(&format!("Tools: {}", names.join(", ")));
            }
        }
        "/clear" => {
            agent.clear_history();
            renderer.info("History cleared.");
        }
        "/help" => {
            println!("{}", "Commands:".bold());
            println!("  {} - list available tools", "/tools".cyan());
            println!("  {} - clear conversation", "/clear".cyan());
            println!("  {} - show this help", "/help".cyan());
            println!("  {} - exit", "exit, quit, Ctrl+D".cyan());
        }
        other => renderer.error(&format!("Unknown command: {other}")),
    }
}
