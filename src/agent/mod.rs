//! The conversation loop.
//!
//! An [`Agent`] owns the history, the tool registry and a [`ChatModel`].
//! [`Agent::run_turn`] sends the user's prompt, executes whatever tools the
//! model asks for, feeds the results back, and repeats until the model
//! answers in plain text or the step budget runs out.

mod error;
mod history;
mod model;

pub use error::AgentError;
pub use model::ChatModel;

use tracing::{debug, info, warn};

use crate::constants::{TOOL_OUTPUT_MAX_BYTES, TOOL_OUTPUT_TRUNCATION_MARKER};
use crate::context::{augment_prompt, Retriever};
use crate::message::{Message, Role, ToolCall};
use crate::output::Renderer;
use crate::tools::{sanitize_tool_name, ToolRegistry};
use history::{prune, TurnGuard};

/// Knobs for the conversation loop.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// When off, no tools are offered and each turn is a single model call.
    pub agentic: bool,
    pub max_steps: usize,
    pub history_cap: usize,
    /// Keep each turn's messages in the history for the next turn.
    pub retain_history: bool,
    /// Snippets requested from the retriever per prompt.
    pub retrieval_top_k: usize,
}

/// What a successful turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutput {
    pub text: String,
    /// How many rounds of tool execution the turn needed.
    pub steps: usize,
}

enum TurnState {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Done(String),
    Aborted,
}

pub struct Agent {
    model: Box<dyn ChatModel>,
    registry: ToolRegistry,
    history: Vec<Message>,
    settings: AgentSettings,
    retriever: Option<Box<dyn Retriever>>,
}

impl Agent {
    /// Creates an agent whose history starts with `system_prompt`, if given.
    pub fn new(
        model: Box<dyn ChatModel>,
        registry: ToolRegistry,
        settings: AgentSettings,
        system_prompt: Option<&str>,
    ) -> Self {
        let history = system_prompt
            .filter(|p| !p.trim().is_empty())
            .map(|p| vec![Message::system(p)])
            .unwrap_or_default();
        Self {
            model,
            registry,
            history,
            settings,
            retriever: None,
        }
    }

    /// Attaches a retriever whose snippets are injected into every prompt.
    pub fn with_retriever(mut self, retriever: Box<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Drops everything except the system message.
    pub fn clear_history(&mut self) {
        self.history.retain(|m| m.role == Role::System);
    }

    /// Replaces the conversation, keeping the current system message when
    /// the loaded one has none.
    pub fn replace_history(&mut self, messages: Vec<Message>) {
        let system = self
            .history
            .first()
            .filter(|m| m.role == Role::System)
            .cloned();
        let has_own_system = messages
            .first()
            .is_some_and(|m| m.role == Role::System);
        self.history = match system {
            Some(system) if !has_own_system => std::iter::once(system).chain(messages).collect(),
            _ => messages,
        };
    }

    /// Adds background material as a standing user message.
    pub fn add_context(&mut self, context: &str) {
        self.history.push(Message::user(context));
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Runs one user turn to completion.
    ///
    /// Tool failures are fed back to the model as text and never end the
    /// turn. Model failures, an empty reply, or running out of steps do.
    /// Unless history retention is on, the history is restored to its
    /// pre-turn length afterwards, whatever the outcome.
    pub async fn run_turn(
        &mut self,
        prompt: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<TurnOutput, AgentError> {
        let prompt = self.augment(prompt, renderer).await;
        prune(&mut self.history, self.settings.history_cap);

        let agentic = self.settings.agentic;
        let max_steps = if agentic {
            self.settings.max_steps.max(1)
        } else {
            1
        };
        let tools = if agentic {
            self.registry.definitions()
        } else {
            Vec::new()
        };

        let mut history = TurnGuard::new(&mut self.history, self.settings.retain_history);
        history.push(Message::user(prompt));

        let mut steps = 0;
        let mut state = TurnState::AwaitingModel;
        loop {
            state = match state {
                TurnState::AwaitingModel => {
                    debug!(step = steps, messages = history.len(), "requesting completion");
                    let choices = self
                        .model
                        .chat(&history, &tools)
                        .await
                        .map_err(AgentError::Model)?;
                    let reply = choices.into_iter().next().ok_or(AgentError::EmptyResponse)?;

                    if agentic && reply.has_tool_calls() {
                        let calls = reply.tool_calls.clone();
                        history.push(reply);
                        TurnState::ExecutingTools(calls)
                    } else {
                        let text = reply.content;
                        history.push(Message::assistant(text.clone()));
                        TurnState::Done(text)
                    }
                }
                TurnState::ExecutingTools(calls) => {
                    for call in calls {
                        let name = sanitize_tool_name(&call.name);
                        renderer.tool_use(name, &call.arguments);
                        let output = match self.registry.execute(name, &call.arguments).await {
                            Ok(output) => output,
                            Err(err) => {
                                warn!(tool = name, error = %err, "tool call failed");
                                format!("Error executing tool: {err}")
                            }
                        };
                        history.push(Message::tool_result(call.id, truncate_output(output)));
                    }
                    steps += 1;
                    if steps >= max_steps {
                        TurnState::Aborted
                    } else {
                        TurnState::AwaitingModel
                    }
                }
                TurnState::Done(text) => {
                    info!(steps, "turn complete");
                    renderer.agent_message(&text);
                    return Ok(TurnOutput { text, steps });
                }
                TurnState::Aborted => {
                    warn!(max_steps, "step limit reached");
                    return Err(AgentError::StepLimit(max_steps));
                }
            };
        }
    }

    async fn augment(&self, prompt: &str, renderer: &mut dyn Renderer) -> String {
        let Some(retriever) = &self.retriever else {
            return prompt.to_string();
        };
        match retriever.search(prompt, self.settings.retrieval_top_k).await {
            Ok(snippets) if !snippets.is_empty() => {
                renderer.info(&format!("Found {} relevant context chunks.", snippets.len()));
                augment_prompt(prompt, &snippets)
            }
            Ok(_) => prompt.to_string(),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "retrieval failed, using the raw prompt");
                prompt.to_string()
            }
        }
    }

    /// Shuts down every MCP server behind the registry.
    pub async fn close(&self) {
        self.registry.close().await;
    }
}

/// Caps tool output at [`TOOL_OUTPUT_MAX_BYTES`], cutting on a char
/// boundary and appending a marker.
fn truncate_output(output: String) -> String {
    if output.len() <= TOOL_OUTPUT_MAX_BYTES {
        return output;
    }
    let mut end = TOOL_OUTPUT_MAX_BYTES;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &output[..end], TOOL_OUTPUT_TRUNCATION_MARKER)
}
