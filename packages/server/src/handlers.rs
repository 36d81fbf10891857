//! HTTP handler functions for the mandate extraction API.

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use fiber_mandate_pdf::{DocumentSource, PagesDocument};
use fiber_mandate_server_models::{
    AnalyzePagesParams, ApiBatchResponse, ApiError, ApiHealth, EXTRACTION_METHOD,
};
use futures::StreamExt as _;

use crate::AppState;

/// Multipart part names that carry a document.
const FILE_FIELDS: &[&str] = &["file", "pdfs"];

/// Accepted upload extensions.
const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".json"];

fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiError::new(message))
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        extraction_method: format!(
            "{EXTRACTION_METHOD}:{}",
            state.pipeline.extractor().rules().name
        ),
        enrichment: state.pipeline.enricher_name().map(str::to_string),
    })
}

/// Reads one multipart field into memory, failing once it exceeds
/// `limit` bytes.
async fn read_field(field: &mut Field, file_name: &str, limit: usize) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| format!("Failed to read upload {file_name}: {e}"))?;
        if bytes.len() + chunk.len() > limit {
            return Err(format!(
                "File {file_name} exceeds the upload limit of {limit} bytes"
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn drain(field: &mut Field) {
    while let Some(chunk) = field.next().await {
        if chunk.is_err() {
            break;
        }
    }
}

/// Collects the uploaded documents in upload order.
async fn collect_uploads(
    payload: &mut Multipart,
    state: &AppState,
) -> Result<Vec<DocumentSource>, String> {
    let mut sources = Vec::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| format!("Invalid multipart body: {e}"))?;

        let is_file_field = field.name().is_some_and(|name| FILE_FIELDS.contains(&name));
        if !is_file_field {
            drain(&mut field).await;
            continue;
        }

        if sources.len() >= state.max_files {
            return Err(format!(
                "Too many files: at most {} per request",
                state.max_files
            ));
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}.pdf", sources.len() + 1));

        let lower = file_name.to_ascii_lowercase();
        if !ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return Err(format!(
                "Unsupported file type: {file_name}. Only .pdf and .json uploads are accepted"
            ));
        }

        let bytes = read_field(&mut field, &file_name, state.max_upload_bytes).await?;
        log::debug!("Received {file_name} ({} bytes)", bytes.len());
        sources.push(DocumentSource::from_bytes(Some(file_name), bytes));
    }

    Ok(sources)
}

/// `POST /api/analyze-pdf`
///
/// Extracts every uploaded document. Per-document failures are reported
/// inside the results; only a malformed request is an HTTP error.
pub async fn analyze_pdf(state: web::Data<AppState>, mut payload: Multipart) -> HttpResponse {
    let sources = match collect_uploads(&mut payload, &state).await {
        Ok(sources) => sources,
        Err(message) => {
            log::warn!("Rejected upload: {message}");
            return bad_request(message);
        }
    };

    if sources.is_empty() {
        return bad_request("No files uploaded. Send one or more 'file' or 'pdfs' parts");
    }

    let results = state
        .pipeline
        .process_batch(sources, state.concurrency, None)
        .await;

    HttpResponse::Ok().json(ApiBatchResponse::new(results))
}

/// `POST /api/analyze-pages`
///
/// Extracts a document supplied as pre-extracted pages.
pub async fn analyze_pages(
    state: web::Data<AppState>,
    params: web::Query<AnalyzePagesParams>,
    body: web::Json<PagesDocument>,
) -> HttpResponse {
    let source = DocumentSource::Pages {
        file_name: params.into_inner().file_name,
        document: body.into_inner(),
    };
    let result = state.pipeline.process(source).await;
    HttpResponse::Ok().json(result)
}
