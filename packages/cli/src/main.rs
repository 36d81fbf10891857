#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tool for FTTH mandate extraction.
//!
//! ```text
//! fiber_mandate extract <FILES...> [--rules PATH] [--variant strict|loose] [--enrich] [--pretty]
//! fiber_mandate serve [--bind-addr ADDR] [--port PORT]
//! fiber_mandate rules [--variant strict|loose]
//! ```
//!
//! Running without a subcommand enters interactive mode.
//!
//! Log output goes through `indicatif-log-bridge` (via
//! [`fiber_mandate_cli_utils::init_logger`]) so log lines and progress bars
//! never fight for the terminal. Results go to stdout.

mod extract;
mod interactive;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fiber_mandate_extract::RuleSet;
use fiber_mandate_server::ServerConfig;

#[derive(Parser)]
#[command(
    name = "fiber_mandate",
    version,
    about = "Extract cable and fiber assignments from FTTH installation mandates"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Rule selection shared by the subcommands.
#[derive(Args, Debug, Clone)]
struct RulesArgs {
    /// Bundled rule variant
    #[arg(long, default_value = "strict")]
    variant: String,
    /// Custom rule file (TOML); takes precedence over --variant
    #[arg(long)]
    rules: Option<PathBuf>,
}

impl RulesArgs {
    fn load(&self) -> Result<RuleSet, Box<dyn std::error::Error>> {
        if let Some(path) = &self.rules {
            log::info!("Loading rules from {}", path.display());
            return Ok(RuleSet::from_file(path)?);
        }
        RuleSet::bundled(&self.variant).ok_or_else(|| {
            format!(
                "Unknown rule variant '{}'. Available: {}",
                self.variant,
                RuleSet::bundled_names().join(", ")
            )
            .into()
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from mandate PDFs (or pre-extracted page JSON)
    Extract {
        /// Files or directories to process
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        rules: RulesArgs,
        /// Ask an LLM to fill fields the rules could not find
        #[arg(long)]
        enrich: bool,
        /// Enrichment provider (openai, ollama, anthropic); defaults to `AI_PROVIDER`
        #[arg(long)]
        provider: Option<String>,
        /// Enrichment timeout per document, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Documents processed concurrently
        #[arg(long, default_value_t = extract::DEFAULT_CONCURRENCY)]
        concurrency: usize,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Start the HTTP API server
    Serve {
        /// Interface to bind (overrides `BIND_ADDR`)
        #[arg(long)]
        bind_addr: Option<String>,
        /// Port to listen on (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
        /// Bundled rule variant (overrides `MANDATE_RULES`)
        #[arg(long)]
        variant: Option<String>,
        /// Custom rule file (overrides `MANDATE_RULES`)
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Print the effective rule set as TOML
    Rules {
        #[command(flatten)]
        rules: RulesArgs,
    },
}

/// Runs the server on actix's own system runtime, on a blocking thread so
/// it does not nest inside the tokio runtime.
async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tokio::task::spawn_blocking(move || {
        actix_web::rt::System::new().block_on(fiber_mandate_server::run_server(config))
    })
    .await??;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let multi = fiber_mandate_cli_utils::init_logger(false);

    let Some(command) = cli.command else {
        return interactive::run(&multi).await;
    };

    match command {
        Commands::Extract {
            files,
            rules,
            enrich,
            provider,
            timeout_secs,
            concurrency,
            pretty,
        } => {
            let enrichment = if enrich || provider.is_some() {
                Some(extract::enrichment_config(provider.as_deref(), timeout_secs)?)
            } else {
                None
            };
            let options = extract::ExtractOptions {
                paths: files,
                rules: rules.load()?,
                enrichment,
                concurrency,
                pretty,
            };
            extract::run(options, &multi).await?;
        }
        Commands::Serve {
            bind_addr,
            port,
            variant,
            rules,
        } => {
            let mut config = ServerConfig::from_env()?;
            if let Some(bind_addr) = bind_addr {
                config.bind_addr = bind_addr;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if variant.is_some() || rules.is_some() {
                config.rules = RulesArgs {
                    variant: variant.unwrap_or_else(|| "strict".to_string()),
                    rules,
                }
                .load()?;
            }
            serve(config).await?;
        }
        Commands::Rules { rules } => {
            print!("{}", rules.load()?.to_toml()?);
        }
    }

    Ok(())
}
