use crate::error::WcrError;
use crate::extraction::assist::AssistService;
use crate::extraction::lines::parse_lines;
use crate::extraction::ocr::OcrEngine;
use crate::extraction::{page_size_checked, Document};
use crate::model::{RawExtraction, RawRecord, Strategy};
use crate::region::{CropBox, FractionalRegion};
use crate::registry::schema::TableSchema;
use std::sync::Arc;
use tracing::{debug, warn};

/// What one strategy produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    Found {
        records: Vec<RawRecord>,
        raw_text: Option<String>,
    },
    Empty {
        raw_text: Option<String>,
    },
}

/// Region extractor: runs the strategies in order until one yields rows.
#[derive(Clone, Default)]
pub struct RegionExtractor {
    ocr: Option<Arc<dyn OcrEngine>>,
    assistant: Option<Arc<dyn AssistService>>,
}

impl RegionExtractor {
    pub fn new(ocr: Option<Arc<dyn OcrEngine>>, assistant: Option<Arc<dyn AssistService>>) -> Self {
        Self { ocr, assistant }
    }

    /// Strategies in the order they are tried.
    pub fn plan(assisted: bool) -> Vec<Strategy> {
        let mut plan = Vec::with_capacity(3);
        if assisted {
            plan.push(Strategy::Assisted);
        }
        plan.push(Strategy::TextLayer);
        plan.push(Strategy::Ocr);
        plan
    }

    /// Extract raw records from `region` of `page`.
    ///
    /// Out-of-range pages are rejected. Strategy failures are logged and fall
    /// through to the next strategy; exhaustion returns an empty result that
    /// still carries any text seen along the way.
    pub fn extract(
        &self,
        doc: &dyn Document,
        page: usize,
        region: &FractionalRegion,
        schema: &TableSchema,
        assisted: bool,
    ) -> Result<RawExtraction, WcrError> {
        let page_size = page_size_checked(doc, page)?;
        let crop = region.to_crop_box(page_size);
        debug!(
            document = doc.name(),
            page,
            x0 = crop.x0,
            y0 = crop.y0,
            x1 = crop.x1,
            y1 = crop.y1,
            "crop box"
        );

        let mut last_text: Option<String> = None;
        for strategy in Self::plan(assisted) {
            let attempt = match self.attempt(strategy, doc, page, &crop, schema) {
                Ok(attempt) => attempt,
                Err(e) => {
                    warn!(%strategy, document = doc.name(), page, error = %e, "strategy failed");
                    Attempt::Empty { raw_text: None }
                }
            };

            match attempt {
                Attempt::Found { records, raw_text } if !records.is_empty() => {
                    debug!(%strategy, records = records.len(), "strategy produced rows");
                    return Ok(RawExtraction {
                        strategy,
                        records,
                        raw_text: raw_text.or(last_text),
                    });
                }
                Attempt::Found { raw_text, .. } | Attempt::Empty { raw_text } => {
                    debug!(%strategy, "strategy produced no rows");
                    if let Some(text) = raw_text.filter(|t| !t.trim().is_empty()) {
                        last_text = Some(text);
                    }
                }
            }
        }

        Ok(RawExtraction::empty(last_text))
    }

    fn attempt(
        &self,
        strategy: Strategy,
        doc: &dyn Document,
        page: usize,
        crop: &CropBox,
        schema: &TableSchema,
    ) -> Result<Attempt, WcrError> {
        match strategy {
            Strategy::Assisted => {
                let assistant = self.assistant.as_ref().ok_or_else(|| {
                    WcrError::service_unavailable("assistant", "no assistant endpoint configured")
                })?;
                let png = doc.render(page, crop)?;
                let rows = assistant.extract_rows(&png, schema)?;
                let rows: Vec<RawRecord> = rows.into_iter().filter(|r| !r.is_empty()).collect();
                Ok(Attempt::Found {
                    records: rows,
                    raw_text: None,
                })
            }
            Strategy::TextLayer => match doc.text_in(page, crop)? {
                Some(text) => Ok(parse_attempt(text)),
                None => Ok(Attempt::Empty { raw_text: None }),
            },
            Strategy::Ocr => {
                let ocr = self.ocr.as_ref().ok_or_else(|| {
                    WcrError::service_unavailable("ocr", "no OCR engine configured")
                })?;
                let png = doc.render(page, crop)?;
                debug!(backend = ocr.backend_name(), bytes = png.len(), "running OCR");
                Ok(parse_attempt(ocr.recognize(&png)?))
            }
            Strategy::None => Ok(Attempt::Empty { raw_text: None }),
        }
    }
}

fn parse_attempt(text: String) -> Attempt {
    let records = parse_lines(&text);
    if records.is_empty() {
        Attempt::Empty {
            raw_text: Some(text),
        }
    } else {
        Attempt::Found {
            records,
            raw_text: Some(text),
        }
    }
}
