//! LLM provider abstraction and implementations.
//!
//! Enrichment is a single-shot prompt: one system instruction, one user
//! message, one text reply. Each provider speaks its own wire format behind
//! [`LlmProvider`].

pub mod anthropic;
pub mod ollama;
pub mod openai;

use crate::AiError;
use crate::config::{EnrichmentConfig, ProviderKind};

/// Sampling temperature for extraction prompts.
pub const TEMPERATURE: f64 = 0.1;

/// Upper bound on reply length. The JSON object is short.
pub const MAX_TOKENS: u32 = 500;

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short identifier for logs (e.g. `"ollama:qwen2.5:1.5b"`).
    fn name(&self) -> &str;

    /// Sends one prompt and returns the model's text reply.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails, the server answers with
    /// an error status, or the reply has no text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError>;
}

/// Builds the HTTP client shared by all providers, bounded by the
/// configured timeout.
///
/// # Errors
///
/// Returns [`AiError::Http`] if the client cannot be built.
fn build_client(config: &EnrichmentConfig) -> Result<reqwest::Client, AiError> {
    Ok(reqwest::Client::builder().timeout(config.timeout).build()?)
}

/// Turns a non-success HTTP reply into [`AiError::Provider`], using the
/// provider's `{"error": {"message": ...}}` or `{"error": "..."}` body when
/// present.
fn status_error(status: reqwest::StatusCode, body: &str) -> AiError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            let error = v.get("error")?;
            error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .or_else(|| error.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {status}: {body}"));
    AiError::Provider { message }
}

/// Creates the provider selected by `config`.
///
/// # Errors
///
/// Returns [`AiError::Config`] if the configuration is incomplete, or
/// [`AiError::Http`] if the HTTP client cannot be built.
pub fn create_provider(config: &EnrichmentConfig) -> Result<Box<dyn LlmProvider>, AiError> {
    config.validate()?;
    let client = build_client(config)?;

    log::info!(
        "AI enrichment: {} model {} at {}",
        config.provider,
        config.model,
        config.base_url
    );

    Ok(match config.provider {
        ProviderKind::OpenAi => Box::new(openai::OpenAiProvider::new(client, config)),
        ProviderKind::Ollama => Box::new(ollama::OllamaProvider::new(client, config)),
        ProviderKind::Anthropic => Box::new(anthropic::AnthropicProvider::new(client, config)?),
    })
}
