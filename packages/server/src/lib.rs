#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for FTTH mandate extraction.
//!
//! Accepts mandate PDFs (or pre-extracted page JSON) over HTTP, runs them
//! through the extraction [`Pipeline`], and returns one
//! [`ExtractionResult`](fiber_mandate_extract::models::ExtractionResult)
//! per document. Optional LLM enrichment is configured through the `AI_*`
//! environment variables.

pub mod config;
mod handlers;
pub mod interactive;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use fiber_mandate_ai::{AiError, LlmEnricher};
use fiber_mandate_extract::{Extractor, Pipeline, RuleError};
use fiber_mandate_server_models::ApiError;
use thiserror::Error;

pub use config::ServerConfig;

/// Errors that prevent the server from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid configuration value.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },

    /// Extraction rules failed to load or compile.
    #[error("Rule error: {0}")]
    Rules(#[from] RuleError),

    /// Enrichment client could not be configured.
    #[error("AI error: {0}")]
    Ai(#[from] AiError),

    /// Binding or running the HTTP server failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Extraction pipeline, with enrichment when configured.
    pub pipeline: Pipeline,
    /// Per-file upload limit in bytes.
    pub max_upload_bytes: usize,
    /// Maximum number of files in one batch request.
    pub max_files: usize,
    /// Documents processed concurrently per request.
    pub concurrency: usize,
}

impl AppState {
    /// Compiles the rules and connects the enrichment provider.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the rules do not compile or the
    /// enrichment provider cannot be created.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let mut pipeline = Pipeline::new(Extractor::new(config.rules.clone())?);

        if let Some(enrichment) = &config.enrichment {
            let enricher = LlmEnricher::from_config(enrichment)?;
            pipeline = pipeline
                .with_enricher(Arc::new(enricher))
                .with_timeout(enrichment.timeout);
        }

        Ok(Self::new(pipeline, config))
    }

    /// Wraps an already-built pipeline.
    #[must_use]
    pub fn new(pipeline: Pipeline, config: &ServerConfig) -> Self {
        Self {
            pipeline,
            max_upload_bytes: config.max_upload_bytes,
            max_files: config.max_files,
            concurrency: config.concurrency,
        }
    }
}

fn cors(config: &ServerConfig) -> Cors {
    if config.allows_any_origin() {
        return Cors::permissive();
    }
    config
        .cors_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}

/// Registers the `/api` routes and the JSON body limit.
pub fn configure(cfg: &mut web::ServiceConfig, max_body_bytes: usize) {
    let json_config = web::JsonConfig::default()
        .limit(max_body_bytes)
        .error_handler(|err, _req| {
            let body = ApiError::new(err.to_string());
            actix_web::error::InternalError::from_response(
                err,
                HttpResponse::BadRequest().json(body),
            )
            .into()
        });

    cfg.service(
        web::scope("/api")
            .app_data(json_config)
            .route("/health", web::get().to(handlers::health))
            .route("/analyze-pdf", web::post().to(handlers::analyze_pdf))
            .route("/analyze-pages", web::post().to(handlers::analyze_pages)),
    );
}

/// Starts the mandate extraction API server.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if the pipeline cannot be built or the HTTP
/// server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let state = web::Data::new(AppState::from_config(&config)?);

    log::info!(
        "Extraction rules: {} (enrichment: {})",
        config.rules.name,
        state.pipeline.enricher_name().unwrap_or("disabled")
    );
    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    let max_body_bytes = config.max_upload_bytes;
    let bind = (config.bind_addr.clone(), config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&config))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(|cfg| configure(cfg, max_body_bytes))
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
