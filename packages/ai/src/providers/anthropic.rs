//! Anthropic Claude provider implementation.

use serde::{Deserialize, Serialize};

use super::{LlmProvider, MAX_TOKENS, TEMPERATURE, status_error};
use crate::AiError;
use crate::config::EnrichmentConfig;

/// Anthropic Claude API provider.
pub struct AnthropicProvider {
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if `config` has no API key.
    pub fn new(client: reqwest::Client, config: &EnrichmentConfig) -> Result<Self, AiError> {
        let api_key = config.api_key.clone().ok_or_else(|| AiError::Config {
            message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
        })?;
        Ok(Self {
            name: format!("anthropic:{}", config.model),
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            client,
        })
    }
}

/// Anthropic API request body.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'a str,
    messages: [AnthropicMessage<'a>; 1],
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Anthropic API response body.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Concatenates the text blocks of a messages response.
fn reply_text(body: &str) -> Result<String, AiError> {
    let response: AnthropicResponse = serde_json::from_str(body)?;
    let text: String = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        return Err(AiError::Provider {
            message: "No text in Anthropic response".to_string(),
        });
    }
    Ok(text)
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AiError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: system_prompt,
            messages: [AnthropicMessage {
                role: "user",
                content: user_prompt,
            }],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        reply_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_text_blocks_and_skips_others() {
        let body = r#"{"content":[{"type":"text","text":"{\"cable\":"},{"type":"thinking","thinking":"..."},{"type":"text","text":"null}"}],"stop_reason":"end_turn"}"#;
        assert_eq!(reply_text(body).unwrap(), "{\"cable\":\nnull}");
    }

    #[test]
    fn empty_content_is_an_error() {
        assert!(matches!(
            reply_text(r#"{"content":[]}"#),
            Err(AiError::Provider { .. })
        ));
    }
}
