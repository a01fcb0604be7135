//! MCP client over a subprocess's stdio.

use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::McpError;
use super::protocol::{
    ClientCapabilities, ClientInfo, InitializeParams, InitializeResult, JsonRpcRequest,
    JsonRpcResponse, McpToolDefinition, ToolCallParams, ToolCallResult, ToolsListResult,
};
use crate::constants::{APP_NAME, MCP_MAX_SKIPPED_LINES, MCP_PROTOCOL_VERSION};

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A connection to one MCP server.
///
/// Requests are strictly sequential: the transport mutex is held from id
/// allocation until the matching response has been read, so two callers
/// can never interleave bytes on the pipe or steal each other's replies.
/// Shared between tool descriptors via `Arc<McpClient>`.
pub struct McpClient {
    /// Command line the server was started with; used in logs and errors.
    name: String,
    transport: Mutex<Transport>,
}

struct Transport {
    /// `None` once the client is closed.
    writer: Option<BoxWriter>,
    reader: Lines<BufReader<BoxReader>>,
    next_id: u64,
    child: Option<Child>,
}

impl McpClient {
    /// Spawns `command` (split on whitespace) and performs the handshake.
    ///
    /// The server's stderr is inherited so its diagnostics reach the
    /// terminal. On handshake failure the child is killed and no client is
    /// returned.
    pub async fn spawn(command: &str) -> Result<Self, McpError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(McpError::EmptyCommand)?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                server: command.to_string(),
                source,
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(McpError::Spawn {
                server: command.to_string(),
                source: std::io::Error::other("failed to capture server stdio"),
            });
        };

        debug!(server = command, pid = ?child.id(), "spawned MCP server");
        Self::connect(command.to_string(), stdout, stdin, Some(child)).await
    }

    /// Wraps an already-open byte stream pair and performs the handshake.
    pub(crate) async fn connect<R, W>(
        name: String,
        reader: R,
        writer: W,
        child: Option<Child>,
    ) -> Result<Self, McpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: BoxReader = Box::new(reader);
        let client = Self {
            name,
            transport: Mutex::new(Transport {
                writer: Some(Box::new(writer)),
                reader: BufReader::new(reader).lines(),
                next_id: 0,
                child,
            }),
        };

        if let Err(err) = client.initialize().await {
            client.close().await;
            return Err(McpError::Handshake {
                server: client.name,
                source: Box::new(err),
            });
        }
        Ok(client)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn initialize(&self) -> Result<(), McpError> {
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: APP_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let result = self
            .call("initialize", Some(serde_json::to_value(&params)?))
            .await?;
        let init: InitializeResult = self.decode("initialize", result)?;

        let server_info = init.server_info.as_ref();
        info!(
            server = %self.name,
            protocol = %init.protocol_version,
            remote_name = server_info.map(|s| s.name.as_str()).unwrap_or("unknown"),
            remote_version = server_info.and_then(|s| s.version.as_deref()).unwrap_or("unknown"),
            "MCP handshake complete"
        );

        self.notify("notifications/initialized", None).await
    }

    /// Sends a request and waits for the response carrying the same id.
    ///
    /// Lines that are not JSON, or that answer some other id, are skipped.
    /// After [`MCP_MAX_SKIPPED_LINES`] such lines in a row the server is
    /// treated as misbehaving and the call fails.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let mut transport = self.transport.lock().await;
        transport.next_id += 1;
        let id = transport.next_id;

        transport
            .send(&self.name, &JsonRpcRequest::request(method, params, id))
            .await?;
        debug!(server = %self.name, method, id, "sent MCP request");

        let mut skipped = 0;
        loop {
            let line = transport
                .reader
                .next_line()
                .await
                .map_err(|source| McpError::Transport {
                    server: self.name.clone(),
                    source,
                })?
                .ok_or_else(|| McpError::ConnectionClosed {
                    server: self.name.clone(),
                })?;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                Ok(response) if response.answers(id) => {
                    if let Some(error) = response.error {
                        return Err(McpError::Rpc {
                            server: self.name.clone(),
                            code: error.code,
                            message: error.message,
                        });
                    }
                    return Ok(response.result.unwrap_or(Value::Null));
                }
                Ok(other) => {
                    warn!(
                        server = %self.name,
                        expected = id,
                        got = ?other.id,
                        method = ?other.method,
                        "skipping MCP message that does not answer the pending request"
                    );
                }
                Err(err) => {
                    debug!(server = %self.name, line = trimmed, %err, "skipping non-JSON line from MCP server");
                }
            }

            skipped += 1;
            if skipped >= MCP_MAX_SKIPPED_LINES {
                return Err(McpError::TooManySkipped {
                    server: self.name.clone(),
                    id,
                    skipped,
                });
            }
        }
    }

    /// Sends a one-way notification. No id is allocated and no reply is read.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let mut transport = self.transport.lock().await;
        transport
            .send(&self.name, &JsonRpcRequest::notification(method, params))
            .await
    }

    /// Fetches the server's tool list.
    pub async fn list_tools(&self) -> Result<Vec<McpToolDefinition>, McpError> {
        let result = self.call("tools/list", None).await?;
        let list: ToolsListResult = self.decode("tools/list", result)?;
        Ok(list.tools)
    }

    /// Invokes a tool. A tool-level failure is reported through
    /// [`ToolCallResult::is_error`], not as an `Err`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult, McpError> {
        let params = serde_json::to_value(ToolCallParams { name, arguments })?;
        let result = self.call("tools/call", Some(params)).await?;
        self.decode("tools/call", result)
    }

    /// Closes stdin, then kills the server. Safe to call more than once.
    pub async fn close(&self) {
        let mut transport = self.transport.lock().await;
        if let Some(mut writer) = transport.writer.take() {
            if let Err(err) = writer.shutdown().await {
                debug!(server = %self.name, %err, "error closing MCP server stdin");
            }
        }
        if let Some(mut child) = transport.child.take() {
            if let Err(err) = child.kill().await {
                debug!(server = %self.name, %err, "error killing MCP server");
            }
            info!(server = %self.name, "MCP server stopped");
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, method: &str, value: Value) -> Result<T, McpError> {
        serde_json::from_value(value).map_err(|source| McpError::InvalidResponse {
            server: self.name.clone(),
            method: method.to_string(),
            source,
        })
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient").field("name", &self.name).finish()
    }
}

impl Transport {
    async fn send(&mut self, server: &str, message: &JsonRpcRequest<'_>) -> Result<(), McpError> {
        let writer = self.writer.as_mut().ok_or_else(|| McpError::Closed {
            server: server.to_string(),
        })?;

        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let io_err = |source| McpError::Transport {
            server: server.to_string(),
            source,
        };
        writer.write_all(&line).await.map_err(io_err)?;
        writer.flush().await.map_err(io_err)
    }
}
