#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Document decoding for FTTH mandate extraction.
//!
//! Mandates arrive either as PDF bytes or as pages that another tool has
//! already extracted (JSON). Both are decoded into a [`Document`]: an
//! ordered list of pages, each exposing its plain text and the [`Table`]s
//! found on it. PDF text comes from pure-Rust extraction
//! ([`pdf_extract`]); tables are derived from its column-aligned text by
//! [`text_table`].
//!
//! The primary entry point is [`DocumentSource::open`].

pub mod text_table;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use fiber_mandate_extract_models::Table;
use serde::{Deserialize, Serialize};

/// Errors raised while opening a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// The bytes are empty, corrupt, or not a PDF.
    #[error("Failed to open document: {0}")]
    Open(String),

    /// The document decoded but has no pages.
    #[error("Document has no pages")]
    NoPages,

    /// A pre-extracted page payload is not valid JSON.
    #[error("Invalid page JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading the document from disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One page of a document.
pub trait Page {
    /// Plain text of the page; empty when the page has none.
    fn text(&self) -> &str;

    /// Tables found on the page, top to bottom.
    fn tables(&self) -> &[Table];
}

/// A decoded document.
pub trait Document {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// The page at `index`, or `None` when out of range.
    fn page(&self, index: usize) -> Option<&dyn Page>;
}

/// An in-memory page: text plus tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// Plain text.
    #[serde(default)]
    pub text: String,
    /// Tables, each a grid of optional cells.
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl PageContent {
    /// Creates a page from text, deriving tables from its aligned columns.
    #[must_use]
    pub fn from_text(text: String) -> Self {
        let tables = text_table::tables_from_text(&text);
        Self { text, tables }
    }
}

impl Page for PageContent {
    fn text(&self) -> &str {
        &self.text
    }

    fn tables(&self) -> &[Table] {
        &self.tables
    }
}

/// A document made of pre-extracted pages.
///
/// Deserializes from `{ "pages": [{ "text": "...", "tables": [[["cell", null]]] }] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagesDocument {
    /// Pages in document order.
    pub pages: Vec<PageContent>,
}

impl PagesDocument {
    /// Parses a pre-extracted page payload.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Json`] if `bytes` is not a valid payload.
    pub fn from_json(bytes: &[u8]) -> Result<Self, DocumentError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Document for PagesDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Option<&dyn Page> {
        self.pages.get(index).map(|p| p as &dyn Page)
    }
}

/// A PDF decoded into text pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfDocument {
    pages: Vec<PageContent>,
}

impl PdfDocument {
    /// Decodes PDF bytes page by page.
    ///
    /// The decoder can panic on malformed input; such panics are caught
    /// and reported as [`DocumentError::Open`].
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Open`] if the bytes are empty or cannot be
    /// decoded as a PDF.
    pub fn open(bytes: &[u8]) -> Result<Self, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Open("empty input".to_owned()));
        }

        let texts = catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }))
        .map_err(|panic| DocumentError::Open(panic_message(panic.as_ref())))?
        .map_err(|e| DocumentError::Open(e.to_string()))?;

        log::debug!("Decoded {} PDF page(s) from {} bytes", texts.len(), bytes.len());

        Ok(Self {
            pages: texts.into_iter().map(PageContent::from_text).collect(),
        })
    }

    /// The decoded pages.
    #[must_use]
    pub fn pages(&self) -> &[PageContent] {
        &self.pages
    }
}

impl Document for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Option<&dyn Page> {
        self.pages.get(index).map(|p| p as &dyn Page)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .map_or_else(
            || "PDF decoder panicked".to_owned(),
            |msg| format!("PDF decoder panicked: {msg}"),
        )
}

/// Input for one document, tagged with its file name when known.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    /// Raw PDF bytes.
    Pdf {
        /// Original file name.
        file_name: Option<String>,
        /// File contents.
        bytes: Vec<u8>,
    },
    /// A JSON pre-extracted page payload, not yet parsed.
    PagesJson {
        /// Original file name.
        file_name: Option<String>,
        /// File contents.
        bytes: Vec<u8>,
    },
    /// Already-parsed pages.
    Pages {
        /// Original file name.
        file_name: Option<String>,
        /// The pages.
        document: PagesDocument,
    },
}

impl DocumentSource {
    /// Wraps uploaded or read bytes, choosing the decoder from the file
    /// extension: `.json` is a page payload, anything else is a PDF.
    #[must_use]
    pub fn from_bytes(file_name: Option<String>, bytes: Vec<u8>) -> Self {
        let is_json = file_name.as_deref().is_some_and(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        });
        if is_json {
            Self::PagesJson { file_name, bytes }
        } else {
            Self::Pdf { file_name, bytes }
        }
    }

    /// Reads a document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Io`] if the file cannot be read.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(Self::from_bytes(file_name, bytes))
    }

    /// The original file name, if known.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Pdf { file_name, .. }
            | Self::PagesJson { file_name, .. }
            | Self::Pages { file_name, .. } => file_name.as_deref(),
        }
    }

    /// Decodes the document. This is CPU-bound; async callers should run
    /// it on a blocking thread.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Open`] for unreadable PDFs and
    /// [`DocumentError::Json`] for malformed page payloads.
    pub fn open(self) -> Result<Box<dyn Document + Send>, DocumentError> {
        Ok(match self {
            Self::Pdf { bytes, .. } => Box::new(PdfDocument::open(&bytes)?),
            Self::PagesJson { bytes, .. } => Box::new(PagesDocument::from_json(&bytes)?),
            Self::Pages { document, .. } => Box::new(document),
        })
    }
}
