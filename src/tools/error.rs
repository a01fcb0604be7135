use thiserror::Error;

use crate::mcp::McpError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid json args from model: {0}")]
    InvalidArguments(#[source] serde_json::Error),
    #[error(transparent)]
    Remote(#[from] McpError),
    #[error(transparent)]
    Builtin(#[from] anyhow::Error),
}
