use anyhow::Result;

use crate::message::Message;
use crate::tools::ToolDefinition;

/// A chat-completion backend.
///
/// Receives the full history (system message first, if any) and the tools
/// the model may call, and returns the candidate replies. Only the first
/// choice is used; an empty list is treated as a failed call.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, history: &[Message], tools: &[ToolDefinition]) -> Result<Vec<Message>>;
}
