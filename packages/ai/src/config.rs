//! Enrichment configuration.
//!
//! Built once at startup, either explicitly or from the `AI_*`
//! environment variables, and handed to [`crate::providers::create_provider`].

use std::time::Duration;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::AiError;

/// Default timeout for one enrichment call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which wire protocol to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProviderKind {
    /// `OpenAI`-compatible `/chat/completions` (`OpenAI`, LM Studio, vLLM,
    /// llama.cpp).
    #[strum(to_string = "openai", serialize = "lmstudio", serialize = "gpt")]
    OpenAi,
    /// Ollama `/api/generate`.
    Ollama,
    /// Anthropic `/v1/messages`.
    #[strum(to_string = "anthropic", serialize = "claude")]
    Anthropic,
}

impl ProviderKind {
    /// Base URL used when none is configured.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }

    /// Model used when none is configured.
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Ollama => "qwen2.5:1.5b",
            Self::Anthropic => "claude-sonnet-4-20250514",
        }
    }

    /// Provider-specific API key variable checked after `AI_API_KEY`.
    const fn key_var(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Ollama => None,
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
        }
    }
}

/// Settings for the LLM enrichment client.
#[derive(Clone, PartialEq, Eq)]
pub struct EnrichmentConfig {
    /// Wire protocol.
    pub provider: ProviderKind,
    /// Server base URL, without a trailing slash.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// API key, if the server needs one.
    pub api_key: Option<String>,
    /// Bound on one enrichment call.
    pub timeout: Duration,
}

impl std::fmt::Debug for EnrichmentConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl EnrichmentConfig {
    /// Creates a config with the provider's default URL and model.
    #[must_use]
    pub fn new(provider: ProviderKind) -> Self {
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            model: provider.default_model().to_string(),
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// Returns `Ok(None)` when `AI_PROVIDER` is unset or `none`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] for an unknown provider, an invalid
    /// timeout, or a missing Anthropic API key.
    pub fn from_env() -> Result<Option<Self>, AiError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value.
    ///
    /// # Errors
    ///
    /// Same as [`EnrichmentConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, AiError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(provider) = var("AI_PROVIDER") else {
            return Ok(None);
        };
        if provider.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        let provider: ProviderKind = provider.parse().map_err(|_| AiError::Config {
            message: format!(
                "Unknown AI provider: {provider}. Use 'openai', 'ollama', 'anthropic', or 'none'."
            ),
        })?;

        let mut config = Self::new(provider);
        if let Some(base_url) = var("AI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = var("AI_MODEL") {
            config.model = model;
        }
        config.api_key = var("AI_API_KEY").or_else(|| provider.key_var().and_then(var));
        if let Some(secs) = var("AI_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| AiError::Config {
                message: format!("AI_TIMEOUT_SECS must be a whole number of seconds, got {secs}"),
            })?;
            config.timeout = Duration::from_secs(secs.max(1));
        }

        config.validate()?;
        Ok(Some(config))
    }

    /// Checks that the provider can be reached with these settings.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if a required API key is missing.
    pub fn validate(&self) -> Result<(), AiError> {
        if self.provider == ProviderKind::Anthropic && self.api_key.is_none() {
            return Err(AiError::Config {
                message: "ANTHROPIC_API_KEY (or AI_API_KEY) is required for the anthropic provider"
                    .to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn unset_or_none_disables_enrichment() {
        assert!(EnrichmentConfig::from_lookup(lookup(&[])).unwrap().is_none());
        assert!(
            EnrichmentConfig::from_lookup(lookup(&[("AI_PROVIDER", "None")]))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn lmstudio_alias_with_overrides() {
        let config = EnrichmentConfig::from_lookup(lookup(&[
            ("AI_PROVIDER", "LMStudio"),
            ("AI_BASE_URL", "http://localhost:1234/v1/"),
            ("AI_MODEL", "qwen/qwen2.5-vl-7b"),
            ("AI_TIMEOUT_SECS", "12"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.provider, ProviderKind::OpenAi);
        assert_eq!(config.base_url, "http://localhost:1234/v1");
        assert_eq!(config.model, "qwen/qwen2.5-vl-7b");
        assert_eq!(config.api_key, None);
        assert_eq!(config.timeout, Duration::from_secs(12));
    }

    #[test]
    fn provider_specific_key_is_used() {
        let config = EnrichmentConfig::from_lookup(lookup(&[
            ("AI_PROVIDER", "anthropic"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert!(!format!("{config:?}").contains("sk-test"));
    }

    #[test]
    fn anthropic_without_key_is_rejected() {
        let err = EnrichmentConfig::from_lookup(lookup(&[("AI_PROVIDER", "claude")])).unwrap_err();
        assert!(matches!(err, AiError::Config { .. }));
    }

    #[test]
    fn unknown_provider_and_bad_timeout_are_rejected() {
        assert!(EnrichmentConfig::from_lookup(lookup(&[("AI_PROVIDER", "bedrock")])).is_err());
        assert!(
            EnrichmentConfig::from_lookup(lookup(&[
                ("AI_PROVIDER", "ollama"),
                ("AI_TIMEOUT_SECS", "soon"),
            ]))
            .is_err()
        );
    }
}
