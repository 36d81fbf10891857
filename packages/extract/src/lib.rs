#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Field extraction for FTTH installation mandates.
//!
//! Given one page of text and the tables found on it, the [`Extractor`]
//! locates the work-order fields (mandate number, socket label, cables,
//! fiber slots, contact details) and scores how complete the result is:
//!
//! 1. scalar fields are matched in the raw text ([`patterns`]),
//! 2. the cable/fiber table header is located ([`header`]) and the rows
//!    below it are harvested ([`harvest`]),
//! 3. when no table yields a cable, cables are recovered from free text
//!    ([`fallback`]),
//! 4. values are merged and scored ([`scoring`]).
//!
//! Everything that varies between mandate layouts lives in a declarative
//! [`RuleSet`]. An optional [`Enricher`] can fill gaps afterwards; the
//! [`Pipeline`] ties decoding, extraction, and enrichment together for
//! whole documents and batches.

pub mod enrich;
pub mod fallback;
pub mod harvest;
pub mod header;
pub mod patterns;
pub mod pipeline;
pub mod progress;
pub mod rules;
pub mod scoring;

pub use enrich::{Enricher, SecondaryFields};
pub use fiber_mandate_extract_models as models;
pub use pipeline::Pipeline;
pub use progress::{NullProgress, ProgressCallback, null_progress};
pub use rules::RuleSet;

use fiber_mandate_extract_models::ExtractionResult;
use fiber_mandate_pdf::{Document, DocumentError, Page};

use crate::harvest::RowHarvester;
use crate::header::HeaderLocator;
use crate::patterns::PatternLibrary;
use crate::scoring::Scorer;

/// Errors raised while loading or compiling a rule set.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The rule set TOML could not be parsed.
    #[error("Invalid rule set TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// The rule set could not be serialized.
    #[error("Failed to serialize rule set: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// A label produced an invalid regex.
    #[error("Invalid label pattern: {0}")]
    Regex(#[from] regex::Error),

    /// The rule set file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The rule set violates an invariant.
    #[error("Invalid rule set: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

/// Extracts mandate fields from pages according to one rule set.
///
/// Holds no mutable state; one instance can serve any number of
/// documents concurrently.
#[derive(Debug, Clone)]
pub struct Extractor {
    rules: RuleSet,
    patterns: PatternLibrary,
    locator: HeaderLocator,
    scorer: Scorer,
}

impl Extractor {
    /// Validates `rules` and compiles its patterns.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Invalid`] if the rule set fails validation, or
    /// [`RuleError::Regex`] if a label cannot be compiled.
    pub fn new(rules: RuleSet) -> Result<Self, RuleError> {
        rules.validate()?;
        let patterns = PatternLibrary::new(&rules.patterns)?;
        let locator = HeaderLocator::new(&rules.table);
        let scorer = Scorer::new(rules.scoring.clone(), rules.slot_count());

        Ok(Self {
            rules,
            patterns,
            locator,
            scorer,
        })
    }

    /// The rule set in use.
    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Extracts and scores one page.
    #[must_use]
    pub fn extract_page(&self, page: &dyn Page) -> ExtractionResult {
        let text = page.text();
        let scalars = self.patterns.scan(text);

        let harvest = RowHarvester::new(&self.rules.table).harvest_tables(&self.locator, page.tables());
        let cables = if harvest.cables.is_empty() {
            if !harvest.header_found {
                log::debug!("No usable table header, scanning text for cables");
            }
            fallback::recover_cables(&self.patterns, text)
        } else {
            harvest.cables
        };

        let data = scoring::compose(scalars, cables, harvest.records, &self.rules.cable_separator);
        self.scorer.score(data, None)
    }

    /// Extracts the first page of `document`.
    ///
    /// A document without pages yields the failure result for
    /// [`DocumentError::NoPages`].
    #[must_use]
    pub fn extract_document(
        &self,
        document: &dyn Document,
        file_name: Option<String>,
    ) -> ExtractionResult {
        let Some(page) = document.page(0) else {
            return ExtractionResult::failure(file_name, DocumentError::NoPages.to_string());
        };
        if document.page_count() > 1 {
            log::debug!(
                "Document has {} pages, extracting the first",
                document.page_count()
            );
        }

        let mut result = self.extract_page(page);
        result.file_name = file_name;
        result
    }

    /// Merges secondary-source proposals into `result` and rescores it.
    pub fn merge_secondary(&self, result: &mut ExtractionResult, secondary: &SecondaryFields) {
        enrich::merge_secondary(result, secondary, &self.rules.cable_separator);
        self.scorer.rescore(result);
    }
}
