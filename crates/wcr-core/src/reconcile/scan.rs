use crate::error::WcrError;
use crate::extraction::blocks::detect_blocks;
use crate::extraction::strategy::RegionExtractor;
use crate::extraction::Document;
use crate::mapping::SchemaMapper;
use crate::reconcile::existence::match_row;
use crate::reconcile::outcome::{ScanRecord, ScanReport};
use crate::region::FractionalRegion;
use crate::registry::schema::TableSchema;
use crate::store::CanonicalStore;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, debug_span, info, warn};

/// Shared flag that asks a running scan to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), WcrError> {
        if self.is_cancelled() {
            Err(WcrError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Pages processed at once.
    pub workers: usize,
    /// Try the assisted strategy first on every block.
    pub assisted: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: 2,
            assisted: false,
        }
    }
}

/// Everything a scan needs besides the document.
pub struct Scanner<'a> {
    pub extractor: &'a RegionExtractor,
    pub mapper: &'a SchemaMapper,
    pub store: &'a dyn CanonicalStore,
    pub options: ScanOptions,
}

impl Scanner<'_> {
    /// Detect, extract, map and look up every record block in `doc`.
    pub fn scan(
        &self,
        doc: &dyn Document,
        schema: &TableSchema,
        cancel: &CancelToken,
    ) -> Result<ScanReport, WcrError> {
        let pages = doc.page_count();
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.options.workers.max(1))
            .thread_name(|i| format!("wcr-scan-{i}"))
            .build()?;

        let per_page: Vec<Vec<ScanRecord>> = pool.install(|| {
            (1..=pages)
                .into_par_iter()
                .map(|page| self.scan_page(doc, page, schema, cancel))
                .collect::<Result<_, _>>()
        })?;

        let report = ScanReport::new(&schema.name, pages, per_page.into_iter().flatten().collect());
        info!(
            document = doc.name(),
            table = %schema.name,
            pages = report.pages_scanned,
            records = report.total_records_found,
            matches = report.database_matches,
            new = report.no_matches,
            "scan complete"
        );
        Ok(report)
    }

    fn scan_page(
        &self,
        doc: &dyn Document,
        page: usize,
        schema: &TableSchema,
        cancel: &CancelToken,
    ) -> Result<Vec<ScanRecord>, WcrError> {
        let _span = debug_span!("scan_page", document = doc.name(), page).entered();
        cancel.check()?;

        let blocks = detect_blocks(doc, page).or_else(|e| match e {
            WcrError::RegionOutOfBounds(_) => Err(e),
            other => {
                warn!(page, error = %other, "block detection failed, scanning whole page");
                Ok(vec![FractionalRegion::full_page()])
            }
        })?;
        debug!(blocks = blocks.len(), "blocks detected");

        let mut records = Vec::new();
        for (i, region) in blocks.iter().enumerate() {
            cancel.check()?;
            let raw = self
                .extractor
                .extract(doc, page, region, schema, self.options.assisted)?;
            if raw.is_empty() {
                continue;
            }
            let (rows, _) = self.mapper.map(schema, &raw.records);
            for row in rows {
                let (status, key) = match_row(&row, schema, self.store)?;
                records.push(ScanRecord {
                    page,
                    block: i + 1,
                    status,
                    key: key.map(|k| k.to_string()),
                    row,
                });
            }
        }
        Ok(records)
    }
}
