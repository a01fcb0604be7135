//! Client side of the Model Context Protocol (MCP).
//!
//! An MCP server is a subprocess that speaks JSON-RPC 2.0 over its standard
//! streams, one JSON object per line. [`McpClient`] owns one such process,
//! performs the `initialize` handshake, and exchanges strictly sequential
//! request/response pairs with it.

pub(crate) mod client;
mod error;
pub mod protocol;

pub use client::McpClient;
pub use error::McpError;
