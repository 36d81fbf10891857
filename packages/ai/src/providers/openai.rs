//! `OpenAI`-compatible chat completions provider.
//!
//! Works against api.openai.com and local servers exposing the same
//! `/chat/completions` route (LM Studio, vLLM, llama.cpp).

use serde::{Deserialize, Serialize};

use super::{LlmProvider, MAX_TOKENS, TEMPERATURE, status_error};
use crate::AiError;
use crate::config::EnrichmentConfig;

/// `OpenAI`-compatible API provider.
pub struct OpenAiProvider {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a provider for `config.base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &EnrichmentConfig) -> Self {
        Self {
            name: format!("openai:{}", config.model),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Extracts the first choice's text from a chat completions body.
fn reply_text(body: &str) -> Result<String, AiError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AiError::Provider {
            message: "No content in chat completion response".to_string(),
        })
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: false,
        };

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let resp = builder.json(&request).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        reply_text(&body)
    }
}
