//! File loading and merging for ai configuration.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::types::{AgentConfig, Config, ProviderConfig, ProviderEntry};
use crate::constants::{
    DEFAULT_HISTORY_CAP, DEFAULT_MAX_STEPS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
    OLLAMA_DEFAULT_BASE_URL, PROJECT_CONFIG_FILENAME, RETRIEVAL_TOP_K,
};

impl Config {
    /// Loads the global config from `~/.config/ai/config.toml`.
    ///
    /// If no config file exists, creates one with sensible defaults
    /// (including `{env:VAR}` placeholders for API keys) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = Self::default_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            return toml::from_str(&default_toml).context("Failed to parse default config");
        }
        Self::load_file(&path)
    }

    pub(super) fn default_toml() -> String {
        format!(
            r#"model = "{DEFAULT_MODEL}"

[agent]
max_steps = {DEFAULT_MAX_STEPS}
history_cap = {DEFAULT_HISTORY_CAP}
retain_history = false
temperature = {DEFAULT_TEMPERATURE:?}
rag_top_k = {RETRIEVAL_TOP_K}

[mcp]
servers = []

[provider.anthropic]
api_key = "{{env:ANTHROPIC_API_KEY}}"

[provider.openai]
api_key = "{{env:OPENAI_API_KEY}}"

[provider.openrouter]
api_key = "{{env:OPENROUTER_API_KEY}}"

[provider.ollama]
base_url = "{OLLAMA_DEFAULT_BASE_URL}"
"#
        )
    }

    pub(super) fn load_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    /// Look for ai.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                return Self::load_file(&candidate).map(Some);
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Merge project config over global config.
    /// Project values win when present; MCP servers from both are started.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        let mut servers = global.mcp.servers;
        for server in project.mcp.servers {
            if !servers.contains(&server) {
                servers.push(server);
            }
        }
        Config {
            model: project.model.or(global.model),
            provider: ProviderConfig {
                openai: merge_entry(global.provider.openai, project.provider.openai),
                anthropic: merge_entry(global.provider.anthropic, project.provider.anthropic),
                ollama: merge_entry(global.provider.ollama, project.provider.ollama),
                openrouter: merge_entry(global.provider.openrouter, project.provider.openrouter),
            },
            system_prompt: project.system_prompt.or(global.system_prompt),
            default_provider: project.default_provider.or(global.default_provider),
            agent: AgentConfig {
                max_steps: project.agent.max_steps.or(global.agent.max_steps),
                history_cap: project.agent.history_cap.or(global.agent.history_cap),
                retain_history: project.agent.retain_history.or(global.agent.retain_history),
                temperature: project.agent.temperature.or(global.agent.temperature),
                rag_top_k: project.agent.rag_top_k.or(global.agent.rag_top_k),
            },
            mcp: super::types::McpConfig { servers },
            editor: project.editor.or(global.editor),
        }
    }
}

fn merge_entry(global: Option<ProviderEntry>, project: Option<ProviderEntry>) -> Option<ProviderEntry> {
    match (global, project) {
        (Some(g), Some(p)) => Some(ProviderEntry {
            api_key: p.api_key.or(g.api_key),
            base_url: p.base_url.or(g.base_url),
            model: p.model.or(g.model),
        }),
        (g, p) => p.or(g),
    }
}
