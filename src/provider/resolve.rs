//! Model resolution logic for ai.
//!
//! Resolves which provider and model to use based on CLI flags, config file,
//! and hardcoded defaults. Supports `provider/model` shorthand syntax.

use anyhow::Result;

use super::kind::ProviderKind;
use crate::config::Config;
use crate::constants::DEFAULT_PROVIDER;

/// Resolved provider + model pair.
#[derive(Debug, PartialEq)]
pub struct ModelSelection {
    pub provider: ProviderKind,
    pub model: String,
}

/// Splits `provider/model` when the prefix names a known provider.
///
/// OpenRouter model ids contain slashes themselves (`org/model`), so an
/// unknown prefix is not an error here.
fn split_shorthand(model: &str) -> Option<(ProviderKind, &str)> {
    let (prov, rest) = model.split_once('/')?;
    ProviderKind::parse(prov).ok().map(|kind| (kind, rest))
}

/// Resolve which provider and model to use.
/// Priority: CLI flags > config.toml > defaults.
///
/// Accepts these formats:
///   --model anthropic/claude-sonnet-4-6  (provider/model shorthand, only when --provider is omitted)
///   --provider openrouter --model "org/model-name"  (slash preserved as model name)
///   --provider anthropic --model claude-sonnet-4-6
///   --provider anthropic  (uses the provider's config entry, then its default model)
///   (nothing)  (uses config.toml, then hardcoded default)
pub fn resolve_model(
    cli_provider: Option<&str>,
    cli_model: Option<&str>,
    config: &Config,
) -> Result<ModelSelection> {
    if cli_provider.is_none() {
        if let Some((provider, model)) = cli_model.and_then(split_shorthand) {
            return Ok(ModelSelection {
                provider,
                model: model.to_string(),
            });
        }
    }

    let config_model = config.model_name();
    let config_shorthand = config_model.and_then(split_shorthand);

    let provider = match cli_provider.or(config.provider_name()) {
        Some(name) => ProviderKind::parse(name)?,
        None => match config_shorthand {
            Some((kind, _)) => kind,
            None => ProviderKind::parse(DEFAULT_PROVIDER)?,
        },
    };

    let model = match cli_model {
        Some(model) => model.to_string(),
        None => config
            .provider_entry(provider.name())
            .and_then(|e| e.model.clone())
            .or_else(|| match config_shorthand {
                Some((kind, model)) if kind == provider => Some(model.to_string()),
                Some(_) => None,
                None => config_model.map(str::to_string),
            })
            .unwrap_or_else(|| provider.default_model().to_string()),
    };

    Ok(ModelSelection { provider, model })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(text: &str) -> Config {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn defaults_without_config() {
        let sel = resolve_model(None, None, &Config::default()).unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenAI);
        assert_eq!(sel.model, "gpt-4o");
    }

    #[test]
    fn cli_shorthand_wins() {
        let sel = resolve_model(None, Some("anthropic/claude-x"), &Config::default()).unwrap();
        assert_eq!(
            sel,
            ModelSelection {
                provider: ProviderKind::Anthropic,
                model: "claude-x".into()
            }
        );
    }

    #[test]
    fn explicit_provider_keeps_slashes_in_model() {
        let sel = resolve_model(Some("openrouter"), Some("org/model"), &Config::default()).unwrap();
        assert_eq!(sel.provider, ProviderKind::OpenRouter);
        assert_eq!(sel.model, "org/model");
    }

    #[test]
    fn provider_flag_uses_provider_default_model() {
        let cfg = config(r#"model = "gpt-4o-mini""#);
        let sel = resolve_model(Some("ollama"), None, &cfg).unwrap();
        assert_eq!(sel.model, "gpt-4o-mini");

        let cfg = config(r#"model = "openai/gpt-4o-mini""#);
        let sel = resolve_model(Some("ollama"), None, &cfg).unwrap();
        assert_eq!(sel.model, "llama3");
    }

    #[test]
    fn config_shorthand_selects_provider() {
        let cfg = config(r#"model = "anthropic/claude-y""#);
        let sel = resolve_model(None, None, &cfg).unwrap();
        assert_eq!(sel.provider, ProviderKind::Anthropic);
        assert_eq!(sel.model, "claude-y");
    }

    #[test]
    fn provider_entry_model_beats_global_model() {
        let cfg = config(
            r#"
            model = "gpt-4o"
            default_provider = "ollama"
            [provider.ollama]
            model = "qwen2.5"
            "#,
        );
        let sel = resolve_model(None, None, &cfg).unwrap();
        assert_eq!(sel.provider, ProviderKind::Ollama);
        assert_eq!(sel.model, "qwen2.5");
    }

    #[test]
    fn unknown_provider_is_an_error() {
        assert!(resolve_model(Some("acme"), None, &Config::default()).is_err());
    }
}
