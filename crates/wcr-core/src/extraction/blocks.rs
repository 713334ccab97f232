use crate::error::WcrError;
use crate::extraction::lines::{classify_line, LineKind};
use crate::extraction::{page_size_checked, Document, LineSpan};
use crate::region::{CropBox, FractionalRegion, PageSize};

/// Padding added around a detected block, in document units.
const BLOCK_PADDING: f64 = 2.0;

/// Largest vertical gap, in median line heights, inside one block.
const MAX_GAP_LINES: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockShape {
    KeyValue,
    Table,
}

/// Find record blocks on a page without a user-supplied region.
///
/// Runs of consecutive key-value lines, or of table lines (header plus at
/// least one row), become one region each. A page with no positioned text
/// (a scan) is returned as a single whole-page block for OCR.
pub fn detect_blocks(doc: &dyn Document, page: usize) -> Result<Vec<FractionalRegion>, WcrError> {
    let page_size = page_size_checked(doc, page)?;
    let spans = doc.line_spans(page)?;
    if spans.is_empty() {
        return Ok(vec![FractionalRegion::full_page()]);
    }
    find_blocks(&spans, page_size)
}

fn find_blocks(spans: &[LineSpan], page_size: PageSize) -> Result<Vec<FractionalRegion>, WcrError> {
    let mut ordered: Vec<&LineSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.line_index.cmp(&b.line_index))
    });
    let max_gap = median_height(&ordered) * MAX_GAP_LINES;

    let mut blocks = Vec::new();
    let mut current: Vec<&LineSpan> = Vec::new();
    let mut shape: Option<BlockShape> = None;

    for span in ordered {
        let line_shape = match classify_line(&span.text) {
            LineKind::KeyValue(..) => Some(BlockShape::KeyValue),
            LineKind::Table(_) => Some(BlockShape::Table),
            LineKind::Other => None,
        };

        let continues = match (current.last(), line_shape) {
            (Some(prev), Some(s)) => shape == Some(s) && span.bbox.y0 - prev.bbox.y1 <= max_gap,
            _ => false,
        };

        if !continues {
            close_block(&mut current, shape, page_size, &mut blocks)?;
            shape = line_shape;
        }
        if line_shape.is_some() {
            current.push(span);
        }
    }
    close_block(&mut current, shape, page_size, &mut blocks)?;

    Ok(blocks)
}

fn close_block(
    current: &mut Vec<&LineSpan>,
    shape: Option<BlockShape>,
    page_size: PageSize,
    out: &mut Vec<FractionalRegion>,
) -> Result<(), WcrError> {
    let min_lines = match shape {
        Some(BlockShape::Table) => 2,
        Some(BlockShape::KeyValue) => 1,
        None => usize::MAX,
    };
    if current.len() >= min_lines {
        let bbox = current
            .iter()
            .skip(1)
            .fold(current[0].bbox, |acc, s| acc.union(&s.bbox));
        let padded = CropBox {
            x0: bbox.x0 - BLOCK_PADDING,
            y0: bbox.y0 - BLOCK_PADDING,
            x1: bbox.x1 + BLOCK_PADDING,
            y1: bbox.y1 + BLOCK_PADDING,
        };
        out.push(FractionalRegion::from_crop_box(&padded, page_size)?);
    }
    current.clear();
    Ok(())
}

fn median_height(spans: &[&LineSpan]) -> f64 {
    let mut heights: Vec<f64> = spans
        .iter()
        .map(|s| s.bbox.height())
        .filter(|h| *h > 0.0)
        .collect();
    if heights.is_empty() {
        return 10.0;
    }
    heights.sort_by(|a, b| a.total_cmp(b));
    heights[heights.len() / 2]
}
