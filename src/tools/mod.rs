//! Tool registry: the single answer to "what can the model call" and "how is
//! a named call executed".
//!
//! Builtin tools implement [`Tool`] and run in-process. Remote tools are
//! discovered from MCP servers and executed through their shared
//! [`McpClient`]. Both kinds are stored as [`ToolEntry`] values in
//! registration order and dispatched by a single match in
//! [`ToolRegistry::execute`].

mod error;
mod schema;

pub use error::ToolError;
pub use schema::{sanitize_schema, sanitize_tool_name};

use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::mcp::protocol::ToolCallResult;
use crate::mcp::McpClient;
use crate::output::Renderer;

/// The result of executing a builtin tool.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// Definition sent to the LLM so it knows what tools are available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema
}

/// Every builtin tool implements this trait.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the LLM uses to call this tool.
    fn name(&self) -> &str;

    /// Human-readable description for the LLM.
    fn description(&self) -> &str;

    /// JSON Schema describing the tool's input parameters.
    fn schema(&self) -> Value;

    /// Execute the tool with the given JSON object input.
    async fn execute(&self, input: Value) -> Result<ToolResult>;
}

/// How a registered tool is executed.
pub enum ToolKind {
    Builtin(Arc<dyn Tool>),
    /// Many entries may share one client; it is closed once by
    /// [`ToolRegistry::close`].
    Remote(Arc<McpClient>),
}

/// One registered capability. Immutable after registration.
pub struct ToolEntry {
    pub definition: ToolDefinition,
    pub kind: ToolKind,
}

/// Holds all registered tools and dispatches calls by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<ToolEntry>,
    /// Every connected server, including ones whose tools were all skipped.
    clients: Vec<Arc<McpClient>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts every MCP server command and registers its tools.
    ///
    /// Fails fast: if any server fails to start or list its tools, every
    /// server started so far is closed and the error is returned.
    pub async fn connect(commands: &[String], renderer: &mut dyn Renderer) -> Result<Self> {
        let mut registry = Self::new();
        for command in commands.iter().filter(|c| !c.trim().is_empty()) {
            renderer.info(&format!("Connecting to MCP: {command}..."));
            if let Err(err) = registry.connect_one(command).await {
                registry.close().await;
                return Err(anyhow::Error::new(err)
                    .context(format!("failed to load MCP server '{command}'")));
            }
        }
        Ok(registry)
    }

    async fn connect_one(&mut self, command: &str) -> Result<usize, ToolError> {
        let client = Arc::new(McpClient::spawn(command).await?);
        match self.load_remote(Arc::clone(&client)).await {
            Ok(count) => Ok(count),
            Err(err) => {
                client.close().await;
                Err(err)
            }
        }
    }

    /// Register a builtin tool.
    ///
    /// The binary ships only MCP tools; in-process tools go through here.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let definition = ToolDefinition {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: sanitize_schema(Some(tool.schema())),
        };
        self.push(ToolEntry {
            definition,
            kind: ToolKind::Builtin(Arc::from(tool)),
        });
    }

    /// Discovers the client's tools and registers one entry per tool.
    ///
    /// Returns how many tools were added. A tool whose name is already
    /// registered is skipped; the first registration wins.
    pub async fn load_remote(&mut self, client: Arc<McpClient>) -> Result<usize, ToolError> {
        let tools = client.list_tools().await?;
        if !self.clients.iter().any(|c| Arc::ptr_eq(c, &client)) {
            self.clients.push(Arc::clone(&client));
        }
        let before = self.tools.len();
        for tool in tools {
            self.push(ToolEntry {
                definition: ToolDefinition {
                    name: tool.name,
                    description: tool.description.unwrap_or_default(),
                    parameters: sanitize_schema(tool.input_schema),
                },
                kind: ToolKind::Remote(Arc::clone(&client)),
            });
        }
        let added = self.tools.len() - before;
        info!(server = client.name(), tools = added, "registered MCP tools");
        Ok(added)
    }

    fn push(&mut self, entry: ToolEntry) {
        if self.find(&entry.definition.name).is_some() {
            warn!(tool = %entry.definition.name, "duplicate tool name, keeping the first registration");
            return;
        }
        self.tools.push(entry);
    }

    fn find(&self, name: &str) -> Option<&ToolEntry> {
        self.tools.iter().find(|t| t.definition.name == name)
    }

    /// Produce definitions for the LLM (sent in the API request), in
    /// registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.definition.name.as_str()).collect()
    }

    /// How many tools are registered.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up a tool by exact name and execute it with the model's raw
    /// argument string.
    ///
    /// Tool-reported failures come back as `Ok` text prefixed with
    /// `Tool Error:` so the model can react to them. `Err` is reserved for
    /// unknown tools, unparsable arguments, and transport failures.
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let entry = self
            .find(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let input = parse_arguments(arguments)?;
        debug!(tool = name, "executing tool");

        match &entry.kind {
            ToolKind::Builtin(tool) => {
                let result = tool.execute(input).await?;
                if result.is_error {
                    Ok(format!("Tool Error: {}", result.content))
                } else {
                    Ok(result.content)
                }
            }
            ToolKind::Remote(client) => {
                let result = client.call_tool(name, input).await?;
                Ok(remote_output(result))
            }
        }
    }

    /// Closes every connected MCP client once, however many tools share it.
    pub async fn close(&self) {
        for client in &self.clients {
            client.close().await;
        }
    }
}

/// Parses model-supplied arguments into a JSON object.
///
/// Models often send nothing at all for parameterless tools, so an empty
/// string or `null` means `{}`.
fn parse_arguments(raw: &str) -> Result<Value, ToolError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "null" {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str::<Map<String, Value>>(raw)
        .map(Value::Object)
        .map_err(ToolError::InvalidArguments)
}

fn remote_output(result: ToolCallResult) -> String {
    if result.is_error {
        return match result.content.first().and_then(|c| c.text.as_deref()) {
            Some(text) => format!("Tool Error: {text}"),
            None => "Tool failed with unspecified error".to_string(),
        };
    }

    let texts: Vec<&str> = result
        .content
        .iter()
        .filter(|c| c.kind == "text")
        .filter_map(|c| c.text.as_deref())
        .collect();
    if texts.is_empty() {
        "success".to_string()
    } else {
        texts.join("\n")
    }
}

#[cfg(test)]
mod tests;
