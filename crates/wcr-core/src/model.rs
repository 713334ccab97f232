use crate::region::FractionalRegion;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field name -> value pairs as read off the document, before mapping.
/// Fields keep the order they appear in on the page.
pub type RawRecord = IndexMap<String, String>;

/// Which extraction strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Assisted,
    TextLayer,
    Ocr,
    /// Every strategy came back empty.
    None,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Assisted => write!(f, "assisted"),
            Strategy::TextLayer => write!(f, "text_layer"),
            Strategy::Ocr => write!(f, "ocr"),
            Strategy::None => write!(f, "none"),
        }
    }
}

/// Unmapped output of the region extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    pub strategy: Strategy,
    pub records: Vec<RawRecord>,
    /// Text seen in the region, kept for display when nothing parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl RawExtraction {
    pub fn empty(raw_text: Option<String>) -> Self {
        Self {
            strategy: Strategy::None,
            records: Vec::new(),
            raw_text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A user- or scan-driven request to extract one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    /// 1-based page number.
    pub page: usize,
    pub region: FractionalRegion,
    /// Document label or table name, e.g. "CASING".
    pub label: String,
    #[serde(default)]
    pub assisted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RowStatus {
    Valid,
    Invalid,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Valid => write!(f, "VALID"),
            RowStatus::Invalid => write!(f, "INVALID"),
        }
    }
}

/// A raw record aligned to a target schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedRow {
    pub table: String,
    /// Canonical column -> value. Keys are always schema columns.
    pub values: BTreeMap<String, String>,
    pub status: RowStatus,
    /// Schema columns without a populated value, in schema order.
    #[serde(default)]
    pub missing: Vec<String>,
    /// Raw fields that matched no column, kept for audit.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unmapped: BTreeMap<String, String>,
}

impl MappedRow {
    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

/// Everything `extract` hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub table: String,
    /// Schema columns, in order, that the mapped rows are shaped to.
    pub schema: Vec<String>,
    pub raw: RawExtraction,
    pub rows: Vec<MappedRow>,
}
