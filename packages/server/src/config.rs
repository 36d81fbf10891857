//! Server configuration.

use std::path::PathBuf;

use fiber_mandate_ai::EnrichmentConfig;
use fiber_mandate_extract::RuleSet;

use crate::ServerError;

/// Default per-file upload limit in megabytes.
pub const DEFAULT_MAX_UPLOAD_MB: usize = 10;

/// Default number of files per batch request.
pub const DEFAULT_MAX_FILES: usize = 50;

/// Default number of documents processed concurrently per request.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Everything the HTTP service needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub bind_addr: String,
    /// TCP port.
    pub port: u16,
    /// Allowed CORS origins. `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// Per-file upload limit in bytes.
    pub max_upload_bytes: usize,
    /// Maximum number of files in one batch request.
    pub max_files: usize,
    /// Documents processed concurrently per request.
    pub concurrency: usize,
    /// LLM enrichment, if enabled.
    pub enrichment: Option<EnrichmentConfig>,
    /// Extraction rules.
    pub rules: RuleSet,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            max_files: DEFAULT_MAX_FILES,
            concurrency: DEFAULT_CONCURRENCY,
            enrichment: None,
            rules: RuleSet::strict(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ServerError> {
    value.parse().map_err(|_| ServerError::Config {
        message: format!("{name} has an invalid value: {value}"),
    })
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if a variable does not parse, the rule
    /// file cannot be loaded, or the enrichment settings are invalid.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();

        if let Some(addr) = var("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(port) = var("PORT") {
            config.port = parse_var("PORT", &port)?;
        }
        if let Some(origins) = var("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(mb) = var("MAX_UPLOAD_SIZE_MB") {
            let mb: usize = parse_var("MAX_UPLOAD_SIZE_MB", &mb)?;
            config.max_upload_bytes = mb.max(1) * 1024 * 1024;
        }
        if let Some(max) = var("MAX_FILES") {
            config.max_files = parse_var::<usize>("MAX_FILES", &max)?.max(1);
        }
        if let Some(n) = var("EXTRACT_CONCURRENCY") {
            config.concurrency = parse_var::<usize>("EXTRACT_CONCURRENCY", &n)?.max(1);
        }
        if let Some(rules) = var("MANDATE_RULES") {
            config.rules = load_rules(&rules)?;
        }

        config.enrichment = EnrichmentConfig::from_lookup(&lookup)?;

        Ok(config)
    }

    /// Whether any origin may call the API.
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

/// Resolves `MANDATE_RULES`: a bundled variant name or a TOML file path.
fn load_rules(value: &str) -> Result<RuleSet, ServerError> {
    if let Some(rules) = RuleSet::bundled(value) {
        return Ok(rules);
    }
    let path = PathBuf::from(value);
    log::info!("Loading extraction rules from {}", path.display());
    Ok(RuleSet::from_file(&path)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.allows_any_origin());
        assert!(config.enrichment.is_none());
        assert_eq!(config.rules.name, "strict");
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "3001"),
            ("CORS_ORIGINS", "http://localhost:5173, https://ops.example.ch"),
            ("MAX_UPLOAD_SIZE_MB", "2"),
            ("MAX_FILES", "5"),
            ("MANDATE_RULES", "loose"),
            ("AI_PROVIDER", "ollama"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:5173", "https://ops.example.ch"]
        );
        assert!(!config.allows_any_origin());
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.max_files, 5);
        assert_eq!(config.rules.name, "loose");
        assert!(config.enrichment.is_some());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(
            ServerConfig::from_lookup(lookup(&[("MANDATE_RULES", "/nonexistent/rules.toml")]))
                .is_err()
        );
        assert!(ServerConfig::from_lookup(lookup(&[("AI_PROVIDER", "bard")])).is_err());
    }
}
