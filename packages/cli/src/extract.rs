//! The `extract` command: run mandates through the pipeline and print the
//! results as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fiber_mandate_ai::{EnrichmentConfig, LlmEnricher, ProviderKind};
use fiber_mandate_cli_utils::{IndicatifProgress, MultiProgress};
use fiber_mandate_extract::models::ExtractionResult;
use fiber_mandate_extract::{Extractor, Pipeline, RuleSet};
use fiber_mandate_pdf::DocumentSource;

/// Default number of documents processed concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Extensions picked up when a directory is given.
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "json"];

/// Options for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Files or directories to process.
    pub paths: Vec<PathBuf>,
    /// Extraction rules.
    pub rules: RuleSet,
    /// Enrichment settings, or `None` to run locally only.
    pub enrichment: Option<EnrichmentConfig>,
    /// Documents processed concurrently.
    pub concurrency: usize,
    /// Pretty-print the JSON output.
    pub pretty: bool,
}

/// Resolves enrichment settings for `--enrich`.
///
/// `AI_*` variables supply the provider; `provider` and `timeout_secs`
/// override them. Without any configured provider a local Ollama server
/// is assumed.
///
/// # Errors
///
/// Returns an error if the provider name is unknown or the environment
/// configuration is invalid.
pub fn enrichment_config(
    provider: Option<&str>,
    timeout_secs: Option<u64>,
) -> Result<EnrichmentConfig, Box<dyn std::error::Error>> {
    let provider = provider
        .map(|name| {
            name.parse::<ProviderKind>()
                .map_err(|_| format!("Unknown AI provider: {name}"))
        })
        .transpose()?;
    let mut config = match (EnrichmentConfig::from_env()?, provider) {
        (Some(config), Some(kind)) if config.provider != kind => EnrichmentConfig {
            api_key: config.api_key,
            ..EnrichmentConfig::new(kind)
        },
        (Some(config), _) => config,
        (None, kind) => EnrichmentConfig::new(kind.unwrap_or(ProviderKind::Ollama)),
    };
    if let Some(secs) = timeout_secs {
        config.timeout = Duration::from_secs(secs.max(1));
    }
    config.validate()?;
    Ok(config)
}

/// Builds the pipeline for `options`.
///
/// # Errors
///
/// Returns an error if the rules do not compile or the enrichment
/// provider cannot be created.
pub fn build_pipeline(
    rules: RuleSet,
    enrichment: Option<&EnrichmentConfig>,
) -> Result<Pipeline, Box<dyn std::error::Error>> {
    let mut pipeline = Pipeline::new(Extractor::new(rules)?);
    if let Some(config) = enrichment {
        pipeline = pipeline
            .with_enricher(Arc::new(LlmEnricher::from_config(config)?))
            .with_timeout(config.timeout);
    }
    Ok(pipeline)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Expands directories into their `.pdf`/`.json` files (sorted by name).
/// Plain file arguments are kept as given, in order.
#[must_use]
pub fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut expanded = Vec::new();
    for path in paths {
        if !path.is_dir() {
            expanded.push(path.clone());
            continue;
        }
        match std::fs::read_dir(path) {
            Ok(entries) => {
                let mut files: Vec<PathBuf> = entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.path())
                    .filter(|p| p.is_file() && is_document(p))
                    .collect();
                files.sort();
                log::debug!("{}: {} document(s)", path.display(), files.len());
                expanded.extend(files);
            }
            Err(e) => {
                log::warn!("Cannot list {}: {e}", path.display());
                expanded.push(path.clone());
            }
        }
    }
    expanded
}

/// Runs every path through `pipeline`, one result per path in input
/// order. Unreadable files become failure results.
pub async fn extract_paths(
    pipeline: &Pipeline,
    paths: &[PathBuf],
    concurrency: usize,
    multi: Option<&MultiProgress>,
) -> Vec<ExtractionResult> {
    let mut slots: Vec<Option<ExtractionResult>> = Vec::with_capacity(paths.len());
    let mut sources = Vec::new();

    for path in paths {
        match DocumentSource::from_path(path) {
            Ok(source) => {
                slots.push(None);
                sources.push(source);
            }
            Err(e) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                log::warn!("Cannot read {}: {e}", path.display());
                slots.push(Some(ExtractionResult::failure(file_name, e.to_string())));
            }
        }
    }

    let progress = multi.map(|multi| IndicatifProgress::documents_bar(multi, "Extracting mandates"));
    let mut processed = pipeline
        .process_batch(sources, concurrency, progress.as_ref())
        .await
        .into_iter();

    slots
        .into_iter()
        .filter_map(|slot| slot.or_else(|| processed.next()))
        .collect()
}

/// Runs the `extract` command and prints the JSON array to stdout.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built or the results cannot
/// be serialized. Individual document failures are part of the output.
pub async fn run(
    options: ExtractOptions,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(options.rules, options.enrichment.as_ref())?;
    let paths = expand_paths(&options.paths);
    if paths.is_empty() {
        return Err("No input files".into());
    }

    let results = extract_paths(&pipeline, &paths, options.concurrency, Some(multi)).await;

    let json = if options.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fiber_mandate_cli_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const PAGES_JSON: &str = r#"{"pages":[{"text":"Disp ID: 24875848\nB.112.603.634.X","tables":[[["Câble","SP1","SP2"],["FTTH 32FSP 0FK 29","12","15"]]]}]}"#;

    #[test]
    fn directories_expand_to_sorted_documents() {
        let dir = temp_dir("expand");
        for name in ["b.pdf", "a.JSON", "notes.txt"] {
            std::fs::write(dir.join(name), b"x").unwrap();
        }
        let single = dir.join("z.pdf");

        let paths = expand_paths(&[single.clone(), dir.clone()]);
        assert_eq!(paths, vec![single, dir.join("a.JSON"), dir.join("b.pdf")]);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn unreadable_files_keep_their_slot() {
        let dir = temp_dir("order");
        let good = dir.join("good.json");
        std::fs::write(&good, PAGES_JSON).unwrap();
        let missing = dir.join("missing.pdf");

        let pipeline = build_pipeline(RuleSet::strict(), None).unwrap();
        let results =
            extract_paths(&pipeline, &[missing, good.clone(), good], 2, None).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].file_name.as_deref(), Some("missing.pdf"));
        assert!(results[0].is_failure());
        for result in &results[1..] {
            assert_eq!(result.file_name.as_deref(), Some("good.json"));
            assert_eq!(result.data.mandate_number.as_deref(), Some("24875848"));
            assert_eq!(result.data.fiber_2.as_deref(), Some("15"));
        }

        std::fs::remove_dir_all(dir).unwrap();
    }
}
