//! End-to-end tests for the extraction and reconciliation pipeline.
//!
//! Documents are mocks with a positioned text layer, so these tests run
//! without poppler, tesseract or network access.

use image::{DynamicImage, RgbImage};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wcr_core::error::WcrError;
use wcr_core::extraction::ocr::OcrEngine;
use wcr_core::extraction::raster::ImageDocument;
use wcr_core::extraction::source::DocumentSource;
use wcr_core::extraction::strategy::RegionExtractor;
use wcr_core::extraction::{text_from_spans, Document, DocumentKind, LineSpan};
use wcr_core::mapping::SchemaMapper;
use wcr_core::model::{RowStatus, Selection, Strategy};
use wcr_core::reconcile::{CancelToken, MatchStatus, ScanOptions};
use wcr_core::region::{CropBox, FractionalRegion, PageSize, PreviewSelection, Viewport};
use wcr_core::store::{CanonicalStore, MemoryStore, RecordKey, SqliteStore};
use wcr_core::Engine;

const LETTER: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[derive(Clone)]
struct MockDocument {
    name: String,
    pages: Vec<Vec<LineSpan>>,
}

impl Document for MockDocument {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, _page: usize) -> Result<PageSize, WcrError> {
        Ok(LETTER)
    }

    fn text_in(&self, page: usize, crop: &CropBox) -> Result<Option<String>, WcrError> {
        Ok(Some(text_from_spans(&self.pages[page - 1], crop)))
    }

    fn line_spans(&self, page: usize) -> Result<Vec<LineSpan>, WcrError> {
        Ok(self.pages[page - 1].clone())
    }

    /// Pages without positioned text stand in for scans and render to a
    /// placeholder PNG.
    fn render(&self, page: usize, _crop: &CropBox) -> Result<Vec<u8>, WcrError> {
        if self.pages[page - 1].is_empty() {
            Ok(PNG_SIGNATURE.to_vec())
        } else {
            Err(WcrError::Extraction("mock documents cannot be rendered".into()))
        }
    }
}

struct MockSource {
    doc: MockDocument,
}

impl DocumentSource for MockSource {
    fn open(&self, reference: &str) -> Result<Box<dyn Document>, WcrError> {
        if reference == self.doc.name {
            Ok(Box::new(self.doc.clone()))
        } else {
            Err(WcrError::DocumentUnavailable {
                reference: reference.to_string(),
                reason: "not uploaded".into(),
            })
        }
    }
}

struct ImageSource {
    name: String,
    image: DynamicImage,
}

impl DocumentSource for ImageSource {
    fn open(&self, reference: &str) -> Result<Box<dyn Document>, WcrError> {
        if reference != self.name {
            return Err(WcrError::DocumentUnavailable {
                reference: reference.to_string(),
                reason: "not uploaded".into(),
            });
        }
        Ok(Box::new(ImageDocument::from_image(
            &self.name,
            self.image.clone(),
        )))
    }
}

/// OCR engine that reads the same text off every PNG it is given.
struct FixedOcr {
    text: String,
    calls: AtomicUsize,
}

impl FixedOcr {
    fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl OcrEngine for FixedOcr {
    fn recognize(&self, png: &[u8]) -> Result<String, WcrError> {
        if !png.starts_with(PNG_SIGNATURE) {
            return Err(WcrError::Extraction("OCR input is not a PNG".into()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }

    fn backend_name(&self) -> &str {
        "fixed"
    }
}

/// Lines of one page, one every 12 units starting at `top`.
fn lines(top: f64, texts: &[&str]) -> Vec<LineSpan> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| LineSpan {
            line_index: i,
            text: text.to_string(),
            bbox: CropBox {
                x0: 72.0,
                y0: top + 12.0 * i as f64,
                x1: 400.0,
                y1: top + 12.0 * i as f64 + 10.0,
            },
        })
        .collect()
}

fn engine(doc: MockDocument, store: Arc<dyn CanonicalStore>) -> Engine {
    Engine::new(
        Arc::new(MockSource { doc }),
        RegionExtractor::default(),
        SchemaMapper::default(),
        store,
    )
}

fn engine_with_ocr(
    source: Arc<dyn DocumentSource>,
    store: Arc<dyn CanonicalStore>,
    ocr: Arc<FixedOcr>,
) -> Engine {
    Engine::new(
        source,
        RegionExtractor::new(Some(ocr), None),
        SchemaMapper::default(),
        store,
    )
}

fn header_document() -> MockDocument {
    MockDocument {
        name: "wcr-1.pdf".into(),
        pages: vec![lines(
            100.0,
            &["WELL HEADER", "UWI: AB-123", "WELL_NAME: Test-1"],
        )],
    }
}

fn store_with(keys: &[&str]) -> Arc<dyn CanonicalStore> {
    let mut store = MemoryStore::new();
    for key in keys {
        store.insert("wcr_wellhead", RecordKey::new([*key]));
    }
    Arc::new(store)
}

#[test]
fn extract_key_value_region() {
    let engine = engine(header_document(), store_with(&[]));
    let selection = Selection {
        page: 1,
        region: FractionalRegion::new(0.0, 0.1, 1.0, 0.2).unwrap(),
        label: "WELL_HEADER".into(),
        assisted: false,
    };

    let out = engine.extract("wcr-1.pdf", &selection).unwrap();

    assert_eq!(out.table, "wcr_wellhead");
    assert_eq!(out.raw.strategy, Strategy::TextLayer);
    assert_eq!(out.rows.len(), 1);
    let row = &out.rows[0];
    assert_eq!(row.value("UWI"), Some("AB-123"));
    assert_eq!(row.value("WELL_NAME"), Some("Test-1"));
    assert_eq!(row.status, RowStatus::Invalid);
    assert!(row.missing.contains(&"FIELD".to_string()));
    assert!(!row.missing.contains(&"UWI".to_string()));
}

#[test]
fn extract_is_independent_of_preview_scale() {
    let engine = engine(header_document(), store_with(&[]));

    let small = engine
        .extract_selection(
            "wcr-1.pdf",
            1,
            Viewport {
                width: 612.0,
                height: 792.0,
            },
            PreviewSelection {
                x: 50.0,
                y: 95.0,
                w: 400.0,
                h: 40.0,
            },
            "WELL_HEADER",
            false,
        )
        .unwrap();
    let large = engine
        .extract_selection(
            "wcr-1.pdf",
            1,
            Viewport {
                width: 1224.0,
                height: 1584.0,
            },
            PreviewSelection {
                x: 100.0,
                y: 190.0,
                w: 800.0,
                h: 80.0,
            },
            "WELL_HEADER",
            false,
        )
        .unwrap();

    assert_eq!(small.rows, large.rows);
    assert_eq!(small.rows[0].value("UWI"), Some("AB-123"));
}

#[test]
fn schema_columns_are_deterministic() {
    let engine = engine(header_document(), store_with(&[]));
    let selection = Selection {
        page: 1,
        region: FractionalRegion::full_page(),
        label: "wcr_wellhead".into(),
        assisted: false,
    };
    let first = engine.extract("wcr-1.pdf", &selection).unwrap();
    let second = engine.extract("wcr-1.pdf", &selection).unwrap();
    assert_eq!(first.schema, second.schema);
    assert_eq!(first.schema[0], "UWI");
}

#[test]
fn extract_rejects_unknown_label_and_page() {
    let engine = engine(header_document(), store_with(&[]));
    let mut selection = Selection {
        page: 1,
        region: FractionalRegion::full_page(),
        label: "PRODUCTION_TESTS".into(),
        assisted: false,
    };
    assert!(matches!(
        engine.extract("wcr-1.pdf", &selection),
        Err(WcrError::SchemaUnknown(_))
    ));

    selection.label = "WELL_HEADER".into();
    selection.page = 2;
    assert!(matches!(
        engine.extract("wcr-1.pdf", &selection),
        Err(WcrError::RegionOutOfBounds(_))
    ));

    selection.page = 1;
    assert!(matches!(
        engine.extract("other.pdf", &selection),
        Err(WcrError::DocumentUnavailable { .. })
    ));
}

#[test]
fn existence_check_finds_stored_well() {
    let engine = engine(header_document(), store_with(&["AB-123"]));
    let out = engine
        .extract(
            "wcr-1.pdf",
            &Selection {
                page: 1,
                region: FractionalRegion::full_page(),
                label: "WELL_HEADER".into(),
                assisted: false,
            },
        )
        .unwrap();

    let report = engine.check_existence(&out.rows, "wcr_wellhead").unwrap();
    assert_eq!(report.found_count, 1);
    assert_eq!(report.missing_count, 0);
    assert_eq!(report.exists[0].value("UWI"), Some("AB-123"));
}

#[test]
fn row_without_key_is_key_incomplete() {
    let doc = MockDocument {
        name: "wcr-2.pdf".into(),
        pages: vec![lines(100.0, &["WELL_NAME: Test-1", "FIELD: North"])],
    };
    let engine = engine(doc, store_with(&["AB-123"]));
    let out = engine
        .extract(
            "wcr-2.pdf",
            &Selection {
                page: 1,
                region: FractionalRegion::full_page(),
                label: "WELL_HEADER".into(),
                assisted: false,
            },
        )
        .unwrap();

    let report = engine.check_existence(&out.rows, "WELL_HEADER").unwrap();
    assert_eq!(report.found_count, 0);
    assert_eq!(report.key_incomplete_count, 1);
    assert_eq!(report.missing_count, 1);
    assert!(report.missing.is_empty());
}

#[test]
fn missing_value_audit_through_engine() {
    let engine = engine(header_document(), store_with(&[]));
    let out = engine
        .extract(
            "wcr-1.pdf",
            &Selection {
                page: 1,
                region: FractionalRegion::full_page(),
                label: "WELL_HEADER".into(),
                assisted: false,
            },
        )
        .unwrap();

    let report = engine.find_missing_values(&out.rows, "WELL_HEADER").unwrap();
    assert_eq!(report.rows_checked, 1);
    assert_eq!(report.rows_with_missing, 1);
    let row = &report.missing_details["row_1"];
    assert_eq!(row.len(), 8);
    assert_eq!(row["OPERATOR"], "MISSING");
}

fn three_page_document() -> MockDocument {
    let mut page1 = lines(60.0, &["UWI: AB-123", "Well Name: Test-1"]);
    page1.extend(lines(400.0, &["UWI: CD-456", "Well Name: New-1"]));
    MockDocument {
        name: "wcr-3.pdf".into(),
        pages: vec![
            page1,
            lines(60.0, &["Drilling summary", "Operations were uneventful"]),
            lines(200.0, &["UWI: EF-789", "Well Name: New-2"]),
        ],
    }
}

#[test]
fn scan_three_page_document() {
    let engine = engine(three_page_document(), store_with(&["AB-123"]))
        .with_scan_options(ScanOptions {
            workers: 2,
            assisted: false,
        });

    let report = engine
        .scan_document_matches("wcr-3.pdf", "WELL_HEADER", &CancelToken::new())
        .unwrap();

    assert_eq!(report.pages_scanned, 3);
    assert_eq!(report.total_records_found, 3);
    assert_eq!(report.database_matches, 1);
    assert_eq!(report.no_matches, 2);
    assert_eq!(
        report.total_records_found,
        report.matches.len() + report.no_matches_data.len()
    );

    assert_eq!(report.matches[0].page, 1);
    assert_eq!(report.matches[0].block, 1);
    assert_eq!(report.matches[0].status, MatchStatus::Found);
    assert_eq!(report.matches[0].key.as_deref(), Some("AB-123"));

    let new: Vec<(usize, Option<&str>)> = report
        .no_matches_data
        .iter()
        .map(|r| (r.page, r.row.value("UWI")))
        .collect();
    assert_eq!(new, vec![(1, Some("CD-456")), (3, Some("EF-789"))]);
    assert!(report
        .no_matches_data
        .iter()
        .all(|r| r.status == MatchStatus::NotFound));
}

#[test]
fn scan_honors_cancellation() {
    let engine = engine(three_page_document(), store_with(&[]));
    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(matches!(
        engine.scan_document_matches("wcr-3.pdf", "WELL_HEADER", &cancel),
        Err(WcrError::Cancelled)
    ));
}

#[test]
fn existence_check_against_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oilgas.db");
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch(
            "CREATE TABLE wcr_wellhead (UWI TEXT PRIMARY KEY, WELL_NAME TEXT);
             INSERT INTO wcr_wellhead VALUES ('  ab-123 ', 'Test-1');",
        )
        .unwrap();

    let store: Arc<dyn CanonicalStore> = Arc::new(SqliteStore::open(&path).unwrap());
    let engine = engine(header_document(), store);
    let out = engine
        .extract(
            "wcr-1.pdf",
            &Selection {
                page: 1,
                region: FractionalRegion::full_page(),
                label: "WELL_HEADER".into(),
                assisted: false,
            },
        )
        .unwrap();

    let report = engine.check_existence(&out.rows, "WELL_HEADER").unwrap();
    assert_eq!(report.found_count, 1);

    let report = engine.check_existence(&out.rows, "CASING");
    // Rows shaped for another table have no casing key.
    assert_eq!(report.unwrap().key_incomplete_count, 1);
}

#[test]
fn scan_splits_adjacent_header_groups() {
    let doc = MockDocument {
        name: "wcr-4.pdf".into(),
        pages: vec![lines(
            60.0,
            &[
                "UWI: AB-123",
                "Well Name: Test-1",
                "UWI: CD-456",
                "Well Name: New-1",
            ],
        )],
    };
    let engine = engine(doc, store_with(&["AB-123"]));

    let report = engine
        .scan_document_matches("wcr-4.pdf", "WELL_HEADER", &CancelToken::new())
        .unwrap();

    assert_eq!(report.total_records_found, 2);
    assert_eq!(report.database_matches, 1);
    assert_eq!(report.no_matches, 1);
    assert_eq!(report.matches[0].row.value("WELL_NAME"), Some("Test-1"));
    let new = &report.no_matches_data[0];
    assert_eq!((new.page, new.block), (1, 1));
    assert_eq!(new.row.value("UWI"), Some("CD-456"));
    assert_eq!(new.row.value("WELL_NAME"), Some("New-1"));
}

#[test]
fn scan_reads_scanned_page_through_ocr() {
    let doc = MockDocument {
        name: "wcr-5.pdf".into(),
        pages: vec![lines(60.0, &["UWI: AB-123", "Well Name: Test-1"]), Vec::new()],
    };
    let ocr = FixedOcr::new("UWI: GH-321\nWell Name: Scan-1");
    let engine = engine_with_ocr(
        Arc::new(MockSource { doc }),
        store_with(&["AB-123"]),
        ocr.clone(),
    );

    let report = engine
        .scan_document_matches("wcr-5.pdf", "WELL_HEADER", &CancelToken::new())
        .unwrap();

    assert_eq!(report.pages_scanned, 2);
    assert_eq!(report.total_records_found, 2);
    assert_eq!(report.matches[0].page, 1);
    assert_eq!(report.no_matches_data.len(), 1);
    let scanned = &report.no_matches_data[0];
    assert_eq!(scanned.page, 2);
    assert_eq!(scanned.status, MatchStatus::NotFound);
    assert_eq!(scanned.row.value("UWI"), Some("GH-321"));
    // The text-layer page never needed OCR.
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn extract_image_upload_through_ocr() {
    let source = ImageSource {
        name: "scan.png".into(),
        image: DynamicImage::ImageRgb8(RgbImage::from_pixel(
            200,
            100,
            image::Rgb([255, 255, 255]),
        )),
    };
    let ocr = FixedOcr::new("UWI: AB-123\nWell Name: Test-1");
    let engine = engine_with_ocr(Arc::new(source), store_with(&[]), ocr.clone());

    let out = engine
        .extract(
            "scan.png",
            &Selection {
                page: 1,
                region: FractionalRegion::new(0.1, 0.1, 0.5, 0.5).unwrap(),
                label: "WELL_HEADER".into(),
                assisted: false,
            },
        )
        .unwrap();

    assert_eq!(out.raw.strategy, Strategy::Ocr);
    assert_eq!(out.rows.len(), 1);
    assert_eq!(out.rows[0].value("UWI"), Some("AB-123"));
    assert_eq!(out.rows[0].value("WELL_NAME"), Some("Test-1"));
    assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
}
