//! Interactive mode: pick a tool and answer a few prompts.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use fiber_mandate_cli_utils::MultiProgress;
use fiber_mandate_extract::RuleSet;

use crate::extract;

/// Top-level tool selection.
enum Tool {
    Extract,
    Server,
    Rules,
}

impl Tool {
    const ALL: &[Self] = &[Self::Extract, Self::Server, Self::Rules];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Extract => "Extract mandates",
            Self::Server => "Start server",
            Self::Rules => "Show extraction rules",
        }
    }
}

fn select_rules() -> Result<RuleSet, Box<dyn std::error::Error>> {
    let names = RuleSet::bundled_names();
    let idx = Select::new()
        .with_prompt("Rule variant")
        .items(&names)
        .default(0)
        .interact()?;
    RuleSet::bundled(names[idx]).ok_or_else(|| format!("Unknown rule variant {}", names[idx]).into())
}

#[allow(clippy::future_not_send)]
async fn run_extract(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt("PDF, JSON, or directory paths (space-separated)")
        .interact_text()?;
    let paths: Vec<PathBuf> = input.split_whitespace().map(PathBuf::from).collect();

    let rules = select_rules()?;

    let enrichment = if Confirm::new()
        .with_prompt("Fill missing fields with an LLM (AI_* settings, Ollama by default)?")
        .default(false)
        .interact()?
    {
        Some(extract::enrichment_config(None, None)?)
    } else {
        None
    };

    let concurrency: usize = Input::new()
        .with_prompt("Documents in parallel")
        .default(extract::DEFAULT_CONCURRENCY)
        .interact_text()?;

    extract::run(
        extract::ExtractOptions {
            paths,
            rules,
            enrichment,
            concurrency,
            pretty: true,
        },
        multi,
    )
    .await
}

/// Runs the interactive menu.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected tool fails.
#[allow(clippy::future_not_send)]
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    println!("FTTH Mandate Extraction");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Extract => run_extract(multi).await?,
        Tool::Server => {
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(fiber_mandate_server::interactive::run())
            })
            .await??;
        }
        Tool::Rules => print!("{}", select_rules()?.to_toml()?),
    }

    Ok(())
}
