#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the mandate extraction server.
//!
//! These envelopes wrap [`ExtractionResult`]s for the REST API. They are
//! separate from the extraction types so the HTTP contract can evolve on
//! its own.

use fiber_mandate_extract_models::ExtractionResult;
use serde::{Deserialize, Serialize};

/// Name reported for the local extraction stage.
pub const EXTRACTION_METHOD: &str = "rules";

/// Response body for `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Local extraction method and rule set (e.g. `"rules:strict"`).
    pub extraction_method: String,
    /// Enrichment provider, or `None` when enrichment is disabled.
    pub enrichment: Option<String>,
}

/// Response body for `POST /api/analyze-pdf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiBatchResponse {
    /// `true` when the request itself was processed. Individual documents
    /// may still have failed; see each result.
    pub success: bool,
    /// Number of results.
    pub count: usize,
    /// One result per uploaded file, in upload order.
    pub results: Vec<ExtractionResult>,
}

impl ApiBatchResponse {
    /// Wraps a batch of results.
    #[must_use]
    pub fn new(results: Vec<ExtractionResult>) -> Self {
        Self {
            success: true,
            count: results.len(),
            results,
        }
    }
}

/// Query parameters for `POST /api/analyze-pages`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzePagesParams {
    /// File name to tag the result with.
    pub file_name: Option<String>,
}

/// Error body for rejected requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable reason.
    pub error: String,
}

impl ApiError {
    /// Creates an error body.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_uses_camel_case() {
        let health = ApiHealth {
            healthy: true,
            version: "0.1.0".to_string(),
            extraction_method: "rules:strict".to_string(),
            enrichment: None,
        };
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["extractionMethod"], "rules:strict");
        assert!(json["enrichment"].is_null());
    }

    #[test]
    fn batch_counts_results() {
        let response = ApiBatchResponse::new(vec![
            ExtractionResult::failure(Some("a.pdf".to_string()), "broken"),
            ExtractionResult::failure(Some("b.pdf".to_string()), "broken"),
        ]);
        assert!(response.success);
        assert_eq!(response.count, 2);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"][1]["file_name"], "b.pdf");
    }
}
