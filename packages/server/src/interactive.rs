//! Interactive mode for the server.
//!
//! Starts from the environment configuration and lets the user adjust the
//! bind address, port, and rule variant before starting.

use dialoguer::{Confirm, Input, Select};
use fiber_mandate_extract::RuleSet;

use crate::{ServerConfig, ServerError};

/// Runs the server in interactive mode, prompting for configuration.
///
/// # Errors
///
/// Returns [`ServerError`] if the environment configuration is invalid or
/// the server fails to start.
#[allow(clippy::future_not_send)]
pub async fn run() -> Result<(), ServerError> {
    println!("FTTH Mandate Extraction Server");
    println!();

    let mut config = ServerConfig::from_env()?;

    config.bind_addr = Input::new()
        .with_prompt("Bind address")
        .default(config.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| config.bind_addr.clone());

    config.port = Input::new()
        .with_prompt("Port")
        .default(config.port)
        .interact_text()
        .unwrap_or(config.port);

    let variants = RuleSet::bundled_names();
    let current = variants
        .iter()
        .position(|name| *name == config.rules.name)
        .unwrap_or(0);
    let idx = Select::new()
        .with_prompt("Rule variant")
        .items(&variants)
        .default(current)
        .interact()
        .unwrap_or(current);
    if let Some(rules) = variants.get(idx).and_then(|name| RuleSet::bundled(name)) {
        config.rules = rules;
    }

    let enrichment = config
        .enrichment
        .as_ref()
        .map_or_else(|| "disabled".to_string(), |e| format!("{} ({})", e.provider, e.model));

    if !Confirm::new()
        .with_prompt(format!(
            "Start server on {}:{} with {} rules, enrichment {enrichment}?",
            config.bind_addr, config.port, config.rules.name
        ))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    crate::run_server(config).await
}
