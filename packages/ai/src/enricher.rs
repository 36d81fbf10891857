//! [`Enricher`] implementation backed by an LLM provider.

use std::fmt::Write as _;
use std::str::FromStr as _;
use std::time::Duration;

use fiber_mandate_extract::{Enricher, SecondaryFields};
use fiber_mandate_extract_models::FieldName;
use serde_json::Value;

use crate::AiError;
use crate::config::EnrichmentConfig;
use crate::providers::{LlmProvider, create_provider};

/// Instruction sent as the system message.
pub const SYSTEM_PROMPT: &str = "You extract fields from Swiss FTTH installation mandates. \
    Respond only with a single valid JSON object and nothing else.";

/// Page text beyond this many characters is not sent to the model.
const MAX_PROMPT_TEXT_CHARS: usize = 12_000;

fn field_hint(field: FieldName) -> &'static str {
    match field {
        FieldName::MandateNumber => "work-order number (Disp ID), digits only",
        FieldName::SocketLabel => "PTO socket reference, shaped like B.123.456.789.X",
        FieldName::Cable => "cable identity from the splice table, e.g. FTTH 1234 FSP01-A",
        FieldName::Fiber1 => "fiber number in splice slot 1, number only",
        FieldName::Fiber2 => "fiber number in splice slot 2, number only",
        FieldName::Fiber3 => "fiber number in splice slot 3, number only",
        FieldName::Fiber4 => "fiber number in splice slot 4, number only",
        FieldName::Phone => "client contact phone number",
        FieldName::Email => "client contact email address",
        FieldName::ClientName => "client name as printed after the address label",
    }
}

/// Builds the user message: the key list followed by the page text.
#[must_use]
pub fn build_prompt(raw_text: &str) -> String {
    let mut prompt = String::from(
        "Extract the following keys from the mandate text below. \
         Use null for any value that is not present. Do not guess.\n\n",
    );
    for &field in FieldName::MERGEABLE {
        let _ = writeln!(prompt, "- \"{}\": {}", field.as_ref(), field_hint(field));
    }

    let text: String = raw_text.chars().take(MAX_PROMPT_TEXT_CHARS).collect();
    prompt.push_str("\nReturn nothing but the JSON object.\n\nMandate text:\n");
    prompt.push_str(&text);
    prompt
}

/// Returns the slice from the first `{` to the last `}` of `reply`.
///
/// Models often wrap the object in prose or code fences.
#[must_use]
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn parse_field_name(key: &str) -> Option<FieldName> {
    let key = key.trim().to_ascii_lowercase();
    match key.as_str() {
        "address" | "client" | "name" => Some(FieldName::ClientName),
        "mandate" | "disp_id" => Some(FieldName::MandateNumber),
        "socket" | "pto" => Some(FieldName::SocketLabel),
        _ => FieldName::from_str(&key).ok(),
    }
}

/// Keeps string and number values of known keys. Nulls, nested values,
/// and unknown keys are dropped.
#[must_use]
pub fn fields_from_json(value: &Value) -> SecondaryFields {
    let mut fields = SecondaryFields::new();
    let Some(object) = value.as_object() else {
        return fields;
    };

    for (key, value) in object {
        let Some(field) = parse_field_name(key) else {
            log::trace!("Ignoring unknown enrichment key {key:?}");
            continue;
        };
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if !text.is_empty() {
            fields.entry(field).or_insert(text);
        }
    }
    fields
}

/// Parses a model reply into field proposals.
///
/// # Errors
///
/// Returns [`AiError::Provider`] if the reply holds no JSON object, or
/// [`AiError::Json`] if the object does not parse.
pub fn parse_reply(reply: &str) -> Result<SecondaryFields, AiError> {
    let json = extract_json_object(reply).ok_or_else(|| AiError::Provider {
        message: "No JSON object in model reply".to_string(),
    })?;
    let value: Value = serde_json::from_str(json)?;
    Ok(fields_from_json(&value))
}

/// Secondary field source that prompts an LLM.
pub struct LlmEnricher {
    provider: Box<dyn LlmProvider>,
}

impl std::fmt::Debug for LlmEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmEnricher")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl LlmEnricher {
    /// Wraps an existing provider.
    #[must_use]
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// Creates the provider described by `config` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the provider cannot be created.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, AiError> {
        Ok(Self::new(create_provider(config)?))
    }

    async fn ask(&self, raw_text: &str) -> Result<SecondaryFields, AiError> {
        let reply = self
            .provider
            .complete(SYSTEM_PROMPT, &build_prompt(raw_text))
            .await?;
        log::trace!("{} reply: {reply}", self.provider.name());
        parse_reply(&reply)
    }
}

#[async_trait::async_trait]
impl Enricher for LlmEnricher {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn extract(&self, raw_text: &str, timeout: Duration) -> Option<SecondaryFields> {
        if raw_text.trim().is_empty() {
            return None;
        }

        match tokio::time::timeout(timeout, self.ask(raw_text)).await {
            Ok(Ok(fields)) => {
                log::debug!(
                    "{} proposed {} field(s)",
                    self.provider.name(),
                    fields.len()
                );
                Some(fields)
            }
            Ok(Err(e)) => {
                log::warn!("Enrichment via {} failed: {e}", self.provider.name());
                None
            }
            Err(_) => {
                log::warn!(
                    "Enrichment via {} timed out after {}ms",
                    self.provider.name(),
                    timeout.as_millis()
                );
                None
            }
        }
    }
}
