//! Configuration types and path resolution for ai.
//!
//! ai stores its settings as TOML at the platform's XDG config path
//! (e.g. `~/.config/ai/config.toml` on Linux), optionally overridden by an
//! `ai.toml` in the project. Command-line flags override both.

mod loader;
mod paths;
mod resolve;
mod types;

pub use types::Config;

use anyhow::Result;

impl Config {
    /// Load config with precedence: project > global > defaults.
    /// Creates default config file if none exists.
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project()?;

        let mut config = global;
        if let Some(proj) = project {
            config = Self::merge(config, proj);
        }

        config.resolve_substitutions();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AGENT_SYSTEM_PROMPT, CHAT_SYSTEM_PROMPT};

    fn parse(text: &str) -> Config {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::default();
        assert_eq!(config.max_steps(), 10);
        assert_eq!(config.history_cap(), 10);
        assert!(!config.retain_history());
        assert_eq!(config.temperature(), 1.0);
        assert!(config.mcp.servers.is_empty());
        assert_eq!(config.model_name(), None);
    }

    #[test]
    fn generated_default_file_parses() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();
        assert_eq!(config.max_steps(), 10);
        assert_eq!(config.temperature(), 1.0);
        assert!(config.provider.ollama.is_some());
    }

    #[test]
    fn agent_and_mcp_tables() {
        let config = parse(
            r#"
            [agent]
            max_steps = 4
            retain_history = true

            [mcp]
            servers = ["npx -y server-a", "uvx server-b"]
            "#,
        );
        assert_eq!(config.max_steps(), 4);
        assert_eq!(config.history_cap(), 10);
        assert!(config.retain_history());
        assert_eq!(config.mcp.servers.len(), 2);
    }

    #[test]
    fn project_overrides_global() {
        let global = parse(
            r#"
            model = "gpt-4o"
            [agent]
            max_steps = 4
            temperature = 0.5
            [mcp]
            servers = ["a"]
            [provider.openai]
            api_key = "global-key"
            base_url = "https://global"
            "#,
        );
        let project = parse(
            r#"
            [agent]
            max_steps = 8
            [mcp]
            servers = ["a", "b"]
            [provider.openai]
            base_url = "https://project"
            "#,
        );
        let merged = Config::merge(global, project);
        assert_eq!(merged.model_name(), Some("gpt-4o"));
        assert_eq!(merged.max_steps(), 8);
        assert_eq!(merged.temperature(), 0.5);
        assert_eq!(merged.mcp.servers, vec!["a", "b"]);
        assert_eq!(merged.rag_top_k(), 3);
        let openai = merged.provider.openai.unwrap();
        assert_eq!(openai.api_key.as_deref(), Some("global-key"));
        assert_eq!(openai.base_url.as_deref(), Some("https://project"));
    }

    #[test]
    fn rag_top_k_and_configured_editor() {
        let config = parse(
            r#"
            editor = "hx"
            [agent]
            rag_top_k = 7
            "#,
        );
        assert_eq!(config.rag_top_k(), 7);
        assert_eq!(config.editor(), "hx");
        assert!(!Config::default().editor().is_empty());
    }

    #[test]
    fn env_placeholders_are_substituted() {
        std::env::set_var("AI_TEST_CONFIG_VAR", "secret");
        assert_eq!(Config::resolve_str("k-{env:AI_TEST_CONFIG_VAR}-x"), "k-secret-x");
        assert_eq!(Config::resolve_str("{env:AI_TEST_UNSET_VAR_XYZ}"), "");
        assert_eq!(Config::resolve_str("{env:unterminated"), "{env:unterminated");
    }

    #[test]
    fn system_prompt_depends_on_agent_mode() {
        let config = Config::default();
        assert_eq!(config.system_prompt_for(true), AGENT_SYSTEM_PROMPT);
        assert_eq!(config.system_prompt_for(false), CHAT_SYSTEM_PROMPT);

        let custom = parse(r#"system_prompt = "Be terse.""#);
        assert_eq!(custom.system_prompt_for(true), "Be terse.");
    }
}
