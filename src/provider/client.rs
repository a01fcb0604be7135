//! LLM provider client.
//!
//! Contains the [`Provider`] struct which wraps rig-core provider clients
//! behind enum dispatch, keeping provider-specific details out of the agent
//! loop. Supports Anthropic, OpenAI, OpenRouter, and Ollama.

use anyhow::{Context, Result};
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, ToolDefinition as RigToolDefinition};
use rig::message::{
    AssistantContent, Message as RigMessage, Text, ToolCall as RigToolCall, ToolFunction,
};
use rig::providers::{anthropic, openai, openrouter};
use rig::OneOrMany;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::kind::ProviderKind;
use super::resolve::ModelSelection;
use crate::agent::ChatModel;
use crate::config::Config;
use crate::constants::MAX_TOKENS;
use crate::message::{Message, Role, ToolCall};
use crate::tools::ToolDefinition;

/// Internal enum wrapping provider-specific clients.
enum ClientKind {
    Anthropic(anthropic::Client),
    OpenAI(openai::Client),
    OpenRouter(openrouter::Client),
    Ollama(openai::Client),
}

/// A configured LLM provider ready to handle completion requests.
///
/// Wraps a rig-core provider client, the target model name and the
/// sampling temperature. Every call is a single non-streaming completion;
/// tool execution is left to the caller.
pub struct Provider {
    client: ClientKind,
    model: String,
    temperature: f64,
}

/// Dispatches an operation across provider-specific clients.
///
/// Matches on [`ClientKind`] and executes the same block for each variant,
/// letting the compiler monomorphize per provider.
macro_rules! dispatch {
    ($self:expr, |$client:ident| $body:expr) => {
        match &$self.client {
            ClientKind::Anthropic($client) => $body,
            ClientKind::OpenAI($client) => $body,
            ClientKind::OpenRouter($client) => $body,
            ClientKind::Ollama($client) => $body,
        }
    };
}

impl Provider {
    /// Creates a new [`Provider`] from the loaded application config.
    ///
    /// Resolves the API key through ai's config precedence chain
    /// (env var → config file → substitution) and builds the appropriate
    /// provider client.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is found for the selected provider
    /// or if client construction fails.
    pub fn from_config(config: &Config, selection: &ModelSelection, temperature: f64) -> Result<Self> {
        let client = match selection.provider {
            ProviderKind::Anthropic => {
                let api_key = config
                    .resolve_api_key("anthropic")
                    .context("No API key found for Anthropic. Set ANTHROPIC_API_KEY or configure it in config.toml")?;
                ClientKind::Anthropic(
                    anthropic::Client::new(&api_key).context("Failed to create Anthropic client")?,
                )
            }
            ProviderKind::OpenAI => {
                let api_key = config
                    .resolve_api_key("openai")
                    .context("No API key found for OpenAI. Set OPENAI_API_KEY or configure it in config.toml")?;
                let client = match config.provider_entry("openai").and_then(|e| e.base_url.as_deref()) {
                    Some(base_url) => openai::Client::builder()
                        .api_key(api_key.as_str())
                        .base_url(base_url.to_string())
                        .build()
                        .context("Failed to create OpenAI client")?,
                    None => openai::Client::new(&api_key).context("Failed to create OpenAI client")?,
                };
                ClientKind::OpenAI(client)
            }
            ProviderKind::OpenRouter => {
                let api_key = config
                    .resolve_api_key("openrouter")
                    .context("No API key found for OpenRouter. Set OPENROUTER_API_KEY or configure it in config.toml")?;
                ClientKind::OpenRouter(
                    openrouter::Client::new(&api_key)
                        .context("Failed to create OpenRouter client")?,
                )
            }
            ProviderKind::Ollama => {
                let base_url = config
                    .provider_entry("ollama")
                    .and_then(|o| o.base_url.as_deref())
                    .unwrap_or(crate::constants::OLLAMA_DEFAULT_BASE_URL);
                let client = openai::Client::builder()
                    .api_key("ollama")
                    .base_url(format!("{}/v1", base_url))
                    .build()
                    .context("Failed to create Ollama client")?;
                ClientKind::Ollama(client)
            }
        };
        Ok(Self {
            client,
            model: selection.model.clone(),
            temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl ChatModel for Provider {
    /// Sends the history as one completion request.
    ///
    /// The leading system message becomes the preamble and the last message
    /// the prompt; everything in between is chat history.
    async fn chat(&self, history: &[Message], tools: &[ToolDefinition]) -> Result<Vec<Message>> {
        let (preamble, rest) = match history.split_first() {
            Some((first, rest)) if first.role == Role::System => (Some(first.text()), rest),
            _ => (None, history),
        };
        let mut messages: Vec<RigMessage> = rest.iter().filter_map(convert_message_to_rig).collect();
        let prompt = messages.pop().context("cannot send an empty conversation")?;
        let tools: Vec<RigToolDefinition> = tools
            .iter()
            .map(|t| RigToolDefinition {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.parameters.clone(),
            })
            .collect();
        debug!(model = %self.model, messages = history.len(), tools = tools.len(), "sending completion request");

        let choice = dispatch!(self, |client| {
            let model = client.completion_model(self.model.as_str());
            let mut request = model
                .completion_request(prompt)
                .messages(messages)
                .tools(tools)
                .temperature(self.temperature)
                .max_tokens(MAX_TOKENS);
            if let Some(preamble) = preamble {
                request = request.preamble(preamble.to_string());
            }
            request
                .send()
                .await
                .context("Completion request failed")?
                .choice
        });

        Ok(vec![convert_choice(choice)])
    }
}

/// Folds a rig response choice into one assistant [`Message`].
///
/// Text parts are concatenated; tool calls keep their arguments as a JSON
/// string, exactly as the loop passes them to the registry.
fn convert_choice(choice: OneOrMany<AssistantContent>) -> Message {
    let mut text = String::new();
    let mut calls = Vec::new();
    for content in choice.into_iter() {
        match content {
            AssistantContent::Text(Text { text: part }) => text.push_str(&part),
            AssistantContent::ToolCall(call) => {
                let arguments = match call.function.arguments {
                    Value::String(raw) => raw,
                    other => other.to_string(),
                };
                calls.push(ToolCall::new(call.id, call.function.name, arguments));
            }
            _ => {}
        }
    }
    Message::assistant_with_tools(text, calls)
}

/// Converts an ai [`Message`] to a rig-core [`RigMessage`].
///
/// Handles all message roles:
/// - **User** → `RigMessage::User` with text content
/// - **Assistant** (text only) → `RigMessage::Assistant` with text content
/// - **Assistant** (with tool calls) → `RigMessage::Assistant` with `ToolCall` content items
/// - **Tool** (result) → `RigMessage::User` with `ToolResult` content
/// - **System** → `None` (system messages are extracted as preamble separately)
fn convert_message_to_rig(msg: &Message) -> Option<RigMessage> {
    match msg.role {
        Role::User => Some(RigMessage::user(msg.text())),
        Role::Assistant => {
            if msg.tool_calls.is_empty() {
                return Some(RigMessage::assistant(msg.text()));
            }
            let mut items: Vec<AssistantContent> = Vec::new();
            let text = msg.text();
            if !text.is_empty() {
                items.push(AssistantContent::Text(Text {
                    text: text.to_string(),
                }));
            }
            for tc in &msg.tool_calls {
                items.push(AssistantContent::ToolCall(RigToolCall::new(
                    tc.id.clone(),
                    ToolFunction::new(tc.name.clone(), arguments_value(&tc.arguments)),
                )));
            }
            Some(RigMessage::Assistant {
                id: None,
                content: OneOrMany::many(items)
                    .unwrap_or_else(|_| OneOrMany::one(AssistantContent::text(""))),
            })
        }
        Role::Tool => {
            let tool_call_id = match &msg.tool_call_id {
                Some(id) => id.clone(),
                None => {
                    warn!("tool message missing tool_call_id, using empty string");
                    String::new()
                }
            };
            Some(RigMessage::tool_result(tool_call_id, msg.text()))
        }
        Role::System => None,
    }
}

/// Providers expect tool-call arguments echoed back as a JSON object.
fn arguments_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn choice_with_text_and_tool_call() {
        let choice = OneOrMany::many(vec![
            AssistantContent::text("Checking. "),
            AssistantContent::ToolCall(RigToolCall::new(
                "call_1".to_string(),
                ToolFunction::new("echo".to_string(), json!({"text": "hi"})),
            )),
        ])
        .unwrap();
        let msg = convert_choice(choice);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Checking. ");
        assert_eq!(msg.tool_calls, vec![ToolCall::new("call_1", "echo", r#"{"text":"hi"}"#)]);
    }

    #[test]
    fn string_arguments_are_kept_verbatim() {
        let choice = OneOrMany::one(AssistantContent::ToolCall(RigToolCall::new(
            "call_2".to_string(),
            ToolFunction::new("echo".to_string(), Value::String("{bad".to_string())),
        )));
        let msg = convert_choice(choice);
        assert_eq!(msg.tool_calls[0].arguments, "{bad");
    }

    #[test]
    fn system_messages_are_not_converted() {
        assert!(convert_message_to_rig(&Message::system("sys")).is_none());
        assert!(convert_message_to_rig(&Message::user("hi")).is_some());
        assert!(convert_message_to_rig(&Message::tool_result("c1", "out")).is_some());
    }

    #[test]
    fn malformed_arguments_become_an_empty_object() {
        assert_eq!(arguments_value(""), json!({}));
        assert_eq!(arguments_value("{bad"), json!({}));
        assert_eq!(arguments_value(r#"{"a":1}"#), json!({"a": 1}));
    }
}
