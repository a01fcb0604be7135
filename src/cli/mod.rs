//! Command-line interface definition and dispatch for ai.
//!
//! Uses [`clap`] for argument parsing with derive macros. A single prompt is
//! answered and the process exits; `--interactive` hands over to the REPL in
//! the [`repl`] submodule.

mod input;
mod repl;

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::agent::{Agent, AgentSettings};
use crate::config::Config;
use crate::context::{load_context_files, with_context, KeywordRetriever};
use crate::output::{Renderer, StdoutRenderer, Theme};
use crate::provider::{resolve_model, Provider};
use crate::session;
use crate::tools::ToolRegistry;

/// Top-level CLI structure for ai.
#[derive(Parser, Debug)]
#[command(
    name = "ai",
    version,
    about = "A CLI AI agent with optional MCP tools and local document context"
)]
pub struct Cli {
    /// The prompt. Piped stdin is appended after a `---` separator
    pub prompt: Vec<String>,
    /// Enable agentic capabilities (tools)
    #[arg(short, long)]
    pub agent: bool,
    /// Retain conversation history between turns
    #[arg(short, long)]
    pub memory: bool,
    /// Maximum number of tool-calling steps per turn
    #[arg(long, value_name = "N")]
    pub steps: Option<usize>,
    /// Model temperature (0.0 - 2.0)
    #[arg(short, long)]
    pub temperature: Option<f64>,
    /// Command that starts an MCP server (repeatable)
    #[arg(long = "mcp", value_name = "CMD")]
    pub mcp: Vec<String>,
    /// Include files matching PATTERN as context (repeatable)
    #[arg(long = "glob", value_name = "PATTERN")]
    pub globs: Vec<String>,
    /// Search files matching PATTERN for context on every prompt (repeatable)
    #[arg(long = "rag", value_name = "PATTERN")]
    pub rag: Vec<String>,
    /// Number of context chunks retrieved per prompt with --rag
    #[arg(long = "rag-top", value_name = "N")]
    pub rag_top: Option<usize>,
    /// Compose the prompt in $EDITOR (piped input and arguments prefill it)
    #[arg(short, long)]
    pub editor: bool,
    /// Start an interactive chat
    #[arg(short, long)]
    pub interactive: bool,
    /// Load chat history from a markdown file
    #[arg(long, value_name = "FILE")]
    pub session: Option<PathBuf>,
    /// Save chat history to a markdown file on exit
    #[arg(long, value_name = "FILE")]
    pub save_session: Option<PathBuf>,
    /// Model to use, optionally as provider/model
    #[arg(long)]
    pub model: Option<String>,
    /// Provider to use (anthropic, openai, openrouter, ollama)
    #[arg(long)]
    pub provider: Option<String>,
    /// More logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

impl Cli {
    fn settings(&self, config: &Config) -> AgentSettings {
        AgentSettings {
            agentic: self.agent,
            max_steps: self.steps.unwrap_or_else(|| config.max_steps()),
            history_cap: config.history_cap(),
            retain_history: self.memory || config.retain_history(),
            retrieval_top_k: self.rag_top.unwrap_or_else(|| config.rag_top_k()),
        }
    }

    /// Config servers first, then `--mcp` ones not already listed.
    fn mcp_servers(&self, config: &Config) -> Vec<String> {
        let mut servers = config.mcp.servers.clone();
        for server in &self.mcp {
            if !servers.contains(server) {
                servers.push(server.clone());
            }
        }
        servers
    }
}

/// Builds the agent, runs the requested mode and always shuts the MCP
/// servers down afterwards.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let mut renderer = StdoutRenderer::new(Theme::detect());

    let settings = cli.settings(&config);
    let selection = resolve_model(cli.provider.as_deref(), cli.model.as_deref(), &config)?;
    let temperature = cli.temperature.unwrap_or_else(|| config.temperature());
    let provider = Provider::from_config(&config, &selection, temperature)?;
    debug!(provider = selection.provider.name(), model = provider.model(), "model selected");
    let retriever = build_retriever(&cli.rag, &mut renderer)?;

    let servers = cli.mcp_servers(&config);
    let registry = if settings.agentic {
        ToolRegistry::connect(&servers, &mut renderer).await?
    } else {
        if !servers.is_empty() {
            warn!("MCP servers are only started in agent mode (--agent)");
        }
        ToolRegistry::new()
    };
    if !registry.is_empty() {
        renderer.info(&format!("Loaded tools: {}", registry.names().join(", ")));
    }

    let system_prompt = config.system_prompt_for(settings.agentic);
    let mut agent = Agent::new(Box::new(provider), registry, settings, Some(&system_prompt));
    if let Some(retriever) = retriever {
        agent = agent.with_retriever(Box::new(retriever));
    }

    let editor = cli.editor.then(|| config.editor());
    let result = drive(&mut agent, &cli, editor.as_deref(), &mut renderer).await;
    if let Some(path) = &cli.save_session {
        match session::save(path, agent.history()) {
            Ok(()) => renderer.info(&format!("Session saved to {}", path.display())),
            Err(err) => renderer.error(&format!("{err:#}")),
        }
    }
    agent.close().await;
    result
}

/// Indexes `--rag` documents, if any were requested.
fn build_retriever(
    patterns: &[String],
    renderer: &mut dyn Renderer,
) -> Result<Option<KeywordRetriever>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let retriever =
        KeywordRetriever::from_patterns(patterns).context("RAG initialization failed")?;
    if retriever.is_empty() {
        renderer.info("No documents matched --rag; continuing without retrieval.");
        return Ok(None);
    }
    renderer.info(&format!("Indexed {} document chunks.", retriever.len()));
    Ok(Some(retriever))
}

async fn drive(
    agent: &mut Agent,
    cli: &Cli,
    editor: Option<&str>,
    renderer: &mut StdoutRenderer,
) -> Result<()> {
    if let Some(path) = &cli.session {
        agent.replace_history(session::load(path)?);
        renderer.info(&format!("Session loaded from {}", path.display()));
    }

    let files = if cli.globs.is_empty() {
        String::new()
    } else {
        load_context_files(&cli.globs).context("Error loading context files")?
    };
    let mut input = input::gather_input(&cli.prompt)?;
    if let Some(editor) = editor {
        input = input::open_editor(editor, &input)?;
    }

    if cli.interactive {
        input::ensure_terminal()?;
        let initial = [files.as_str(), input.as_str()]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        let retain = agent.settings().retain_history;
        return repl::run(agent, renderer, initial, retain).await;
    }

    if input.trim().is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }
    let prompt = if files.is_empty() {
        input
    } else {
        with_context(&files, &input)
    };

    run_turn_interruptible(agent, &prompt, renderer).await
}

/// Runs one turn, abandoning it on Ctrl+C.
pub(crate) async fn run_turn_interruptible(
    agent: &mut Agent,
    prompt: &str,
    renderer: &mut StdoutRenderer,
) -> Result<()> {
    tokio::select! {
        result = agent.run_turn(prompt, renderer) => {
            let output = result?;
            debug!(steps = output.steps, chars = output.text.len(), "turn finished");
        }
        _ = tokio::signal::ctrl_c() => {
            renderer.error("interrupted");
        }
    }
    Ok(())
}
