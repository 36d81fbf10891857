//! Per-document pipeline and batch runner.
//!
//! One document goes through: decode (blocking thread) → local extraction
//! → optional enrichment under a timeout → merge and rescore. Documents are
//! independent, so a batch runs several pipelines concurrently and returns
//! their results in input order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fiber_mandate_extract_models::ExtractionResult;
use fiber_mandate_pdf::{DocumentError, DocumentSource};

use crate::Extractor;
use crate::enrich::Enricher;
use crate::progress::ProgressCallback;

/// Default bound on one enrichment call.
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extraction plus optional enrichment for whole documents.
#[derive(Clone)]
pub struct Pipeline {
    extractor: Arc<Extractor>,
    enricher: Option<Arc<dyn Enricher>>,
    timeout: Duration,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("rules", &self.extractor.rules().name)
            .field("enricher", &self.enricher_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Pipeline {
    /// Creates a pipeline without enrichment.
    #[must_use]
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor: Arc::new(extractor),
            enricher: None,
            timeout: DEFAULT_ENRICHMENT_TIMEOUT,
        }
    }

    /// Adds a secondary source consulted after local extraction.
    #[must_use]
    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Sets the bound on each enrichment call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The local extractor.
    #[must_use]
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Name of the configured enricher, if any.
    #[must_use]
    pub fn enricher_name(&self) -> Option<&str> {
        self.enricher.as_deref().map(Enricher::name)
    }

    /// Processes one document. Never fails: decode errors and panics
    /// become failure results.
    pub async fn process(&self, source: DocumentSource) -> ExtractionResult {
        let start = Instant::now();
        let file_name = source.file_name().map(str::to_owned);
        let extractor = Arc::clone(&self.extractor);
        let name = file_name.clone();

        let decoded = tokio::task::spawn_blocking(move || {
            let document = source.open()?;
            let text = document
                .page(0)
                .map(|page| page.text().to_owned())
                .unwrap_or_default();
            Ok::<_, DocumentError>((extractor.extract_document(&*document, name), text))
        })
        .await;

        let (mut result, text) = match decoded {
            Ok(Ok(extracted)) => extracted,
            Ok(Err(e)) => {
                log::warn!("{}: {e}", display_name(file_name.as_deref()));
                return ExtractionResult::failure(file_name, e.to_string());
            }
            Err(e) => {
                log::error!("{}: extraction task failed: {e}", display_name(file_name.as_deref()));
                return ExtractionResult::failure(file_name, format!("Extraction task failed: {e}"));
            }
        };

        if !result.is_failure() {
            self.enrich(&mut result, &text).await;
        }

        log::info!(
            "{}: confidence {:.1}, missing {:?} ({:.2?})",
            display_name(result.file_name.as_deref()),
            result.confidence,
            result.missing_fields,
            start.elapsed()
        );

        result
    }

    /// Runs the enricher under the pipeline timeout and merges whatever it
    /// returns. Timeouts and empty replies leave `result` untouched.
    async fn enrich(&self, result: &mut ExtractionResult, text: &str) {
        let Some(enricher) = &self.enricher else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }

        match tokio::time::timeout(self.timeout, enricher.extract(text, self.timeout)).await {
            Ok(Some(fields)) => {
                log::debug!("{} proposed {} field(s)", enricher.name(), fields.len());
                self.extractor.merge_secondary(result, &fields);
            }
            Ok(None) => log::debug!("{} returned nothing", enricher.name()),
            Err(_) => log::warn!(
                "{} timed out after {:?}",
                enricher.name(),
                self.timeout
            ),
        }
    }

    /// Processes `sources` with up to `concurrency` documents in flight.
    ///
    /// Results are returned in input order, one per source.
    pub async fn process_batch(
        &self,
        sources: Vec<DocumentSource>,
        concurrency: usize,
        progress: Option<&Arc<dyn ProgressCallback>>,
    ) -> Vec<ExtractionResult> {
        use futures::stream::{self, StreamExt as _};

        let total = sources.len();
        log::info!("Processing {total} document(s) (concurrency={concurrency})");
        if let Some(p) = progress {
            p.set_total(total as u64);
        }

        let results: Vec<ExtractionResult> = stream::iter(sources.into_iter().map(|source| async move {
            let result = self.process(source).await;
            if let Some(p) = progress {
                if let Some(name) = &result.file_name {
                    p.set_message(name.clone());
                }
                p.inc(1);
            }
            result
        }))
        .buffered(concurrency.max(1))
        .collect()
        .await;

        let failed = results.iter().filter(|r| r.is_failure()).count();
        let review = results.iter().filter(|r| r.needs_review).count();
        if let Some(p) = progress {
            p.finish(format!("{total} document(s), {review} need review"));
        }
        log::info!("Batch done: {total} document(s), {failed} failed, {review} need review");

        results
    }
}

fn display_name(file_name: Option<&str>) -> &str {
    file_name.unwrap_or("<unnamed>")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use fiber_mandate_extract_models::{FieldName, Table};
    use fiber_mandate_pdf::{PageContent, PagesDocument};

    use super::*;
    use crate::enrich::SecondaryFields;
    use crate::rules::RuleSet;

    struct CannedEnricher {
        fields: SecondaryFields,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Enricher for CannedEnricher {
        fn name(&self) -> &str {
            "canned"
        }

        async fn extract(&self, _raw_text: &str, _timeout: Duration) -> Option<SecondaryFields> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(self.fields.clone())
        }
    }

    struct StalledEnricher;

    #[async_trait::async_trait]
    impl Enricher for StalledEnricher {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn extract(&self, _raw_text: &str, _timeout: Duration) -> Option<SecondaryFields> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Some(BTreeMap::from([(FieldName::Cable, "GARBAGE".to_owned())]))
        }
    }

    struct SilentEnricher;

    #[async_trait::async_trait]
    impl Enricher for SilentEnricher {
        fn name(&self) -> &str {
            "silent"
        }

        async fn extract(&self, _raw_text: &str, _timeout: Duration) -> Option<SecondaryFields> {
            None
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(Extractor::new(RuleSet::strict()).unwrap())
    }

    fn pages_source(name: &str, text: &str, tables: Vec<Table>) -> DocumentSource {
        DocumentSource::Pages {
            file_name: Some(name.to_owned()),
            document: PagesDocument {
                pages: vec![PageContent {
                    text: text.to_owned(),
                    tables,
                }],
            },
        }
    }

    fn missing_cable_source() -> DocumentSource {
        pages_source(
            "a.json",
            "Disp ID: 24875848\nSocket Label: B.112.603.634.X",
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn enrichment_fills_missing_cable_and_rescores() {
        let enricher = Arc::new(CannedEnricher {
            fields: BTreeMap::from([
                (FieldName::Cable, "FTTH 32FSP 0FK 29".to_owned()),
                (FieldName::MandateNumber, "11111111".to_owned()),
            ]),
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline().with_enricher(enricher.clone());

        let result = pipeline.process(missing_cable_source()).await;
        assert_eq!(enricher.calls.load(Ordering::SeqCst), 1);
        assert!(result.success);
        assert_eq!(result.data.cable.as_deref(), Some("FTTH 32FSP 0FK 29"));
        assert_eq!(result.enriched_fields, vec![FieldName::Cable]);
        assert_eq!(result.data.mandate_number.as_deref(), Some("24875848"));
        assert_eq!(
            result.data.mandate_number_alternative.as_deref(),
            Some("11111111")
        );
        assert!((result.confidence - 0.7).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn enrichment_timeout_contributes_nothing() {
        let pipeline = pipeline()
            .with_enricher(Arc::new(StalledEnricher))
            .with_timeout(Duration::from_millis(50));

        let result = pipeline.process(missing_cable_source()).await;
        assert!(result.enriched_fields.is_empty());
        assert_eq!(result.data.cable, None);
        assert_eq!(result.missing_fields, vec![FieldName::Cable]);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn absent_enrichment_matches_local_result() {
        let local = pipeline().process(missing_cable_source()).await;
        let silent = pipeline()
            .with_enricher(Arc::new(SilentEnricher))
            .process(missing_cable_source())
            .await;
        assert_eq!(local, silent);
    }

    #[tokio::test]
    async fn failed_documents_skip_enrichment() {
        let enricher = Arc::new(CannedEnricher {
            fields: SecondaryFields::new(),
            calls: AtomicUsize::new(0),
        });
        let pipeline = pipeline().with_enricher(enricher.clone());
        let source = DocumentSource::from_bytes(Some("broken.pdf".to_owned()), b"%PDF-garbage".to_vec());

        let result = pipeline.process(source).await;
        assert!(result.is_failure());
        assert_eq!(result.file_name.as_deref(), Some("broken.pdf"));
        assert_eq!(enricher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_page_list_is_a_no_pages_failure() {
        let source = DocumentSource::Pages {
            file_name: Some("empty.json".to_owned()),
            document: PagesDocument::default(),
        };
        let result = pipeline().process(source).await;
        assert!(!result.success);
        assert!(result.confidence.abs() < f64::EPSILON);
        assert_eq!(
            result.error.as_deref(),
            Some(DocumentError::NoPages.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn batch_preserves_input_order() {
        let sources: Vec<DocumentSource> = (0..6)
            .map(|i| pages_source(&format!("doc-{i}.json"), &format!("Disp ID: 1000000{i}"), Vec::new()))
            .collect();

        let results = pipeline().process_batch(sources, 3, None).await;
        let names: Vec<_> = results.iter().filter_map(|r| r.file_name.clone()).collect();
        assert_eq!(
            names,
            (0..6).map(|i| format!("doc-{i}.json")).collect::<Vec<_>>()
        );
        assert_eq!(results[4].data.mandate_number.as_deref(), Some("10000004"));
    }
}
