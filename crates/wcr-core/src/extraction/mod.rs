pub mod assist;
pub mod blocks;
pub mod lines;
pub mod ocr;
pub mod pdftotext;
pub mod raster;
pub mod source;
pub mod strategy;

use crate::error::WcrError;
use crate::region::{CropBox, PageSize};

/// A positioned line of embedded text.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSpan {
    pub line_index: usize,
    /// Line text. Wide horizontal gaps between words are kept as runs of
    /// spaces so column layout survives.
    pub text: String,
    pub bbox: CropBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Vector document with a (possibly empty) text layer. Units are points.
    Pdf,
    /// Single raster image. Units are pixels.
    Image,
}

/// Page-level access to an opened document.
///
/// Page numbers are 1-based. Callers check bounds with [`page_size_checked`]
/// before using the other methods.
pub trait Document: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> DocumentKind;

    fn page_count(&self) -> usize;

    /// Intrinsic page size as recorded in the document itself.
    fn page_size(&self, page: usize) -> Result<PageSize, WcrError>;

    /// Embedded text inside `crop`, layout preserved. `None` when the page
    /// has no text layer at all.
    fn text_in(&self, page: usize, crop: &CropBox) -> Result<Option<String>, WcrError>;

    /// Positioned text lines for the whole page. Empty without a text layer.
    fn line_spans(&self, page: usize) -> Result<Vec<LineSpan>, WcrError>;

    /// Rasterize `crop` to PNG bytes.
    fn render(&self, page: usize, crop: &CropBox) -> Result<Vec<u8>, WcrError>;
}

/// Page size after checking `page` is inside the document.
pub fn page_size_checked(doc: &dyn Document, page: usize) -> Result<PageSize, WcrError> {
    if page == 0 || page > doc.page_count() {
        return Err(WcrError::RegionOutOfBounds(format!(
            "page {} is outside '{}' (1..={})",
            page,
            doc.name(),
            doc.page_count()
        )));
    }
    doc.page_size(page)
}

/// Join the text of the spans that overlap `crop`, top to bottom.
pub fn text_from_spans(spans: &[LineSpan], crop: &CropBox) -> String {
    let mut hits: Vec<&LineSpan> = spans.iter().filter(|s| s.bbox.intersects(crop)).collect();
    hits.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.line_index.cmp(&b.line_index))
    });
    hits.iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
