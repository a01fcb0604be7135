//! Struct definitions for ai configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for ai, deserialized from `config.toml`.
///
/// Every field is optional so ai can run with no config file at all;
/// accessors in `resolve.rs` supply the defaults.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Default model identifier, optionally as `provider/model`.
    #[serde(default)]
    pub model: Option<String>,
    /// Per-provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Default provider name (e.g., "anthropic", "openai").
    #[serde(default)]
    pub default_provider: Option<String>,
    /// System prompt seeded into every conversation. When unset, the
    /// default depends on whether agent mode is on.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Conversation loop settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// MCP servers started on every run.
    #[serde(default)]
    pub mcp: McpConfig,
    /// Editor used by `--editor`. Falls back to `$EDITOR`.
    #[serde(default)]
    pub editor: Option<String>,
}

/// Provider-specific configuration map.
///
/// Each field corresponds to a supported LLM provider. Only providers
/// the user has configured will be `Some`.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    pub openai: Option<ProviderEntry>,
    pub anthropic: Option<ProviderEntry>,
    pub ollama: Option<ProviderEntry>,
    pub openrouter: Option<ProviderEntry>,
}

/// Connection details for a single LLM provider.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProviderEntry {
    /// API key for authentication. Can also be set via environment variables.
    pub api_key: Option<String>,
    /// Custom base URL for the provider's API (useful for proxies or self-hosted instances).
    pub base_url: Option<String>,
    /// Model identifier to use with this provider, overriding the global default.
    pub model: Option<String>,
}

/// `[agent]` table.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct AgentConfig {
    /// Tool-execution rounds allowed per turn.
    pub max_steps: Option<usize>,
    /// History length kept between turns, system message included.
    pub history_cap: Option<usize>,
    /// Keep each turn's messages for the next turn.
    pub retain_history: Option<bool>,
    pub temperature: Option<f64>,
    /// Snippets injected per prompt when `--rag` is on.
    pub rag_top_k: Option<usize>,
}

/// `[mcp]` table.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct McpConfig {
    /// Server command lines, e.g. `"npx -y @modelcontextprotocol/server-filesystem ."`.
    #[serde(default)]
    pub servers: Vec<String>,
}
