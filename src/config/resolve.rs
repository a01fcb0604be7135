//! Environment variable substitution and settings resolution.

use super::types::{Config, ProviderEntry};

use crate::constants::{
    AGENT_SYSTEM_PROMPT, CHAT_SYSTEM_PROMPT, DEFAULT_HISTORY_CAP, DEFAULT_MAX_STEPS,
    DEFAULT_TEMPERATURE, FALLBACK_EDITORS, LAST_RESORT_EDITOR, RETRIEVAL_TOP_K,
};

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    pub(super) fn resolve_substitutions(&mut self) {
        for field in [
            &mut self.model,
            &mut self.system_prompt,
            &mut self.default_provider,
            &mut self.editor,
        ]
            .into_iter()
            .flatten()
        {
            *field = Self::resolve_str(field);
        }
        Self::resolve_provider_entry(&mut self.provider.openai);
        Self::resolve_provider_entry(&mut self.provider.anthropic);
        Self::resolve_provider_entry(&mut self.provider.ollama);
        Self::resolve_provider_entry(&mut self.provider.openrouter);
        for server in &mut self.mcp.servers {
            *server = Self::resolve_str(server);
        }
    }

    /// Resolves `{env:VAR}` patterns in a single provider entry's `api_key` and `base_url`.
    fn resolve_provider_entry(entry: &mut Option<ProviderEntry>) {
        if let Some(ref mut e) = entry {
            if let Some(ref mut key) = e.api_key {
                *key = Self::resolve_str(key);
            }
            if let Some(ref mut url) = e.base_url {
                *url = Self::resolve_str(url);
            }
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    pub(super) fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// Resolve API key for a provider: env var first, then config value.
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        let env_key = format!("{}_API_KEY", provider.to_uppercase());
        if let Ok(val) = std::env::var(&env_key) {
            if !val.is_empty() {
                return Some(val);
            }
        }

        self.provider_entry(provider)
            .and_then(|e| e.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    pub fn provider_entry(&self, provider: &str) -> Option<&ProviderEntry> {
        match provider {
            "openai" => self.provider.openai.as_ref(),
            "anthropic" => self.provider.anthropic.as_ref(),
            "ollama" => self.provider.ollama.as_ref(),
            "openrouter" => self.provider.openrouter.as_ref(),
            _ => None,
        }
    }

    /// Get the configured default provider name, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.default_provider.as_deref().filter(|p| !p.is_empty())
    }

    /// The configured model, still possibly in `provider/model` form.
    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.is_empty())
    }

    pub fn max_steps(&self) -> usize {
        self.agent.max_steps.unwrap_or(DEFAULT_MAX_STEPS)
    }

    pub fn history_cap(&self) -> usize {
        self.agent.history_cap.unwrap_or(DEFAULT_HISTORY_CAP)
    }

    pub fn retain_history(&self) -> bool {
        self.agent.retain_history.unwrap_or(false)
    }

    pub fn temperature(&self) -> f64 {
        self.agent.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn rag_top_k(&self) -> usize {
        self.agent.rag_top_k.unwrap_or(RETRIEVAL_TOP_K)
    }

    /// Editor command for `--editor`.
    /// Priority: config > `$EDITOR` > first of vim/nano on `PATH` > vi.
    pub fn editor(&self) -> String {
        self.editor
            .clone()
            .filter(|e| !e.trim().is_empty())
            .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
            .or_else(|| {
                FALLBACK_EDITORS
                    .iter()
                    .find(|name| on_path(name))
                    .map(|name| name.to_string())
            })
            .unwrap_or_else(|| LAST_RESORT_EDITOR.to_string())
    }

    /// The system prompt to seed a conversation with.
    pub fn system_prompt_for(&self, agentic: bool) -> String {
        match self.system_prompt.as_deref() {
            Some(prompt) if !prompt.trim().is_empty() => prompt.to_string(),
            _ if agentic => AGENT_SYSTEM_PROMPT.to_string(),
            _ => CHAT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Whether an executable named `name` exists in a `PATH` directory.
fn on_path(name: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(name).is_file()))
        .unwrap_or(false)
}
