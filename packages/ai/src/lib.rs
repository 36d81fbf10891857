#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM-backed secondary source for mandate fields.
//!
//! Supports any `OpenAI`-compatible chat completions server (`OpenAI`,
//! LM Studio, vLLM, llama.cpp), Ollama's native generate API, and
//! Anthropic Claude. [`LlmEnricher`] wraps a provider behind the
//! [`fiber_mandate_extract::Enricher`] trait: it asks the model for the
//! mandate fields as a JSON object and turns the reply into field
//! proposals. Every failure (transport, HTTP status, timeout, unparseable
//! reply) is logged and reported as no proposal at all.

pub mod config;
pub mod enricher;
pub mod providers;

pub use config::{EnrichmentConfig, ProviderKind};
pub use enricher::LlmEnricher;

use thiserror::Error;

/// Errors that can occur while talking to an LLM provider.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
