pub mod config;
pub mod error;
pub mod extraction;
pub mod mapping;
pub mod model;
pub mod reconcile;
pub mod region;
pub mod registry;
pub mod store;
pub mod validate;

use config::Config;
use error::WcrError;
use extraction::assist::AssistService;
use extraction::ocr::OcrEngine;
use extraction::source::DocumentSource;
use extraction::strategy::RegionExtractor;
use mapping::SchemaMapper;
use model::{ExtractionOutput, MappedRow, Selection};
use reconcile::{CancelToken, ExistenceReport, ScanOptions, ScanReport, Scanner};
use region::{PreviewSelection, Viewport};
use std::sync::Arc;
use store::{CanonicalStore, MemoryStore};
use tracing::{debug, warn};
use validate::MissingValueReport;

/// The extraction and reconciliation pipeline with its collaborators wired in.
///
/// Holds no per-request state; every operation can be called concurrently.
pub struct Engine {
    source: Arc<dyn DocumentSource>,
    extractor: RegionExtractor,
    mapper: SchemaMapper,
    store: Arc<dyn CanonicalStore>,
    scan: ScanOptions,
}

impl Engine {
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: RegionExtractor,
        mapper: SchemaMapper,
        store: Arc<dyn CanonicalStore>,
    ) -> Self {
        Self {
            source,
            extractor,
            mapper,
            store,
            scan: ScanOptions::default(),
        }
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    /// Wire up the production collaborators described by `config`.
    ///
    /// A database file that does not exist yet behaves like an empty store:
    /// every record is reported as new.
    pub fn from_config(config: &Config) -> Result<Self, WcrError> {
        let assistant = config
            .assistant()?
            .map(|a| Arc::new(a) as Arc<dyn AssistService>);
        let ocr: Arc<dyn OcrEngine> = Arc::new(config.tesseract());

        let store: Arc<dyn CanonicalStore> = if config.store.database.exists() {
            Arc::new(config.open_store()?)
        } else {
            warn!(
                database = %config.store.database.display(),
                "canonical store not found, treating every record as new"
            );
            Arc::new(MemoryStore::new())
        };

        let engine = Self::new(
            Arc::new(config.upload_dir()),
            RegionExtractor::new(Some(ocr), assistant.clone()),
            SchemaMapper::new(assistant),
            store,
        );
        Ok(engine.with_scan_options(ScanOptions {
            workers: config.scan.workers,
            assisted: config.scan.assisted,
        }))
    }

    /// Extract one region of a document and map it onto the selected table.
    pub fn extract(
        &self,
        reference: &str,
        selection: &Selection,
    ) -> Result<ExtractionOutput, WcrError> {
        let schema = registry::resolve(&selection.label)?;
        let doc = self.source.open(reference)?;
        debug!(
            document = doc.name(),
            kind = ?doc.kind(),
            page = selection.page,
            table = %schema.name,
            assisted = selection.assisted,
            "extracting region"
        );

        let raw = self.extractor.extract(
            doc.as_ref(),
            selection.page,
            &selection.region,
            schema,
            selection.assisted,
        )?;
        let (rows, columns) = self.mapper.map(schema, &raw.records);

        Ok(ExtractionOutput {
            table: schema.name.clone(),
            schema: columns,
            raw,
            rows,
        })
    }

    /// Like [`Engine::extract`], for a rectangle drawn on a rendered preview.
    pub fn extract_selection(
        &self,
        reference: &str,
        page: usize,
        viewport: Viewport,
        drawn: PreviewSelection,
        label: &str,
        assisted: bool,
    ) -> Result<ExtractionOutput, WcrError> {
        let selection = Selection {
            page,
            region: region::normalize(viewport, drawn)?,
            label: label.to_string(),
            assisted,
        };
        self.extract(reference, &selection)
    }

    /// Split rows by whether their key already exists in the canonical store.
    pub fn check_existence(
        &self,
        rows: &[MappedRow],
        table: &str,
    ) -> Result<ExistenceReport, WcrError> {
        let schema = registry::resolve(table)?;
        reconcile::check_existence(rows, schema, self.store.as_ref())
    }

    /// Report unpopulated columns per row.
    pub fn find_missing_values(
        &self,
        rows: &[MappedRow],
        table: &str,
    ) -> Result<MissingValueReport, WcrError> {
        let schema = registry::resolve(table)?;
        Ok(validate::find_missing_values(rows, schema))
    }

    /// Extract every record block in a document and look each one up.
    pub fn scan_document_matches(
        &self,
        reference: &str,
        table: &str,
        cancel: &CancelToken,
    ) -> Result<ScanReport, WcrError> {
        let schema = registry::resolve(table)?;
        let doc = self.source.open(reference)?;
        let scanner = Scanner {
            extractor: &self.extractor,
            mapper: &self.mapper,
            store: self.store.as_ref(),
            options: self.scan,
        };
        scanner.scan(doc.as_ref(), schema, cancel)
    }
}
