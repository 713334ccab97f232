use crate::model::MappedRow;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of looking a batch of rows up in the canonical store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistenceReport {
    /// Rows whose key is already stored.
    pub exists: Vec<MappedRow>,
    /// Rows with a complete key that is not stored yet.
    pub missing: Vec<MappedRow>,
    /// Rows lacking one or more key values; never looked up.
    pub key_incomplete: Vec<MappedRow>,
    pub found_count: usize,
    /// `missing.len() + key_incomplete.len()`.
    pub missing_count: usize,
    pub key_incomplete_count: usize,
}

impl ExistenceReport {
    pub fn new(
        exists: Vec<MappedRow>,
        missing: Vec<MappedRow>,
        key_incomplete: Vec<MappedRow>,
    ) -> Self {
        Self {
            found_count: exists.len(),
            missing_count: missing.len() + key_incomplete.len(),
            key_incomplete_count: key_incomplete.len(),
            exists,
            missing,
            key_incomplete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Found,
    NotFound,
    KeyIncomplete,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Found => write!(f, "FOUND"),
            MatchStatus::NotFound => write!(f, "NOT_FOUND"),
            MatchStatus::KeyIncomplete => write!(f, "KEY_INCOMPLETE"),
        }
    }
}

/// One record discovered by a document scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    /// 1-based page the record was read from.
    pub page: usize,
    /// 1-based block index on that page.
    pub block: usize,
    pub status: MatchStatus,
    /// Normalized key, when complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub row: MappedRow,
}

/// Whole-document reconciliation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub table: String,
    pub pages_scanned: usize,
    pub total_records_found: usize,
    pub database_matches: usize,
    pub no_matches: usize,
    /// Records already stored, ordered by page then block.
    pub matches: Vec<ScanRecord>,
    /// Records not stored, including those with incomplete keys.
    pub no_matches_data: Vec<ScanRecord>,
}

impl ScanReport {
    pub fn new(table: &str, pages_scanned: usize, records: Vec<ScanRecord>) -> Self {
        let (matches, no_matches_data): (Vec<_>, Vec<_>) = records
            .into_iter()
            .partition(|r| r.status == MatchStatus::Found);
        Self {
            table: table.to_string(),
            pages_scanned,
            total_records_found: matches.len() + no_matches_data.len(),
            database_matches: matches.len(),
            no_matches: no_matches_data.len(),
            matches,
            no_matches_data,
        }
    }
}
