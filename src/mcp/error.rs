use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("empty MCP server command")]
    EmptyCommand,
    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("MCP server '{server}' transport error: {source}")]
    Transport {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("MCP server '{server}': connection closed or response not received")]
    ConnectionClosed { server: String },
    #[error("MCP server '{server}' has been closed")]
    Closed { server: String },
    #[error("MCP server '{server}' returned error code {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' sent a malformed '{method}' response: {source}")]
    InvalidResponse {
        server: String,
        method: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode MCP request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("MCP server '{server}' sent {skipped} lines without answering request {id}")]
    TooManySkipped {
        server: String,
        id: u64,
        skipped: usize,
    },
    #[error("MCP handshake with '{server}' failed: {source}")]
    Handshake {
        server: String,
        #[source]
        source: Box<McpError>,
    },
}
