//! Ollama native generate provider.

use serde::{Deserialize, Serialize};

use super::{LlmProvider, MAX_TOKENS, TEMPERATURE, status_error};
use crate::AiError;
use crate::config::EnrichmentConfig;

/// Ollama `/api/generate` provider.
pub struct OllamaProvider {
    name: String,
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Creates a provider for the Ollama server at `config.base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &EnrichmentConfig) -> Self {
        Self {
            name: format!("ollama:{}", config.model),
            endpoint: format!("{}/api/generate", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            client,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError> {
        let request = GenerateRequest {
            model: &self.model,
            system: system_prompt,
            prompt: user_prompt,
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                num_predict: MAX_TOKENS,
            },
        };

        let resp = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let response: GenerateResponse = serde_json::from_str(&body)?;
        if response.response.trim().is_empty() {
            return Err(AiError::Provider {
                message: "Empty response from Ollama".to_string(),
            });
        }
        Ok(response.response)
    }
}
