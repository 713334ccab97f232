use crate::model::{MappedRow, RowStatus};
use crate::registry::schema::TableSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Marker written against each unpopulated column in a missing-value report.
pub const MISSING: &str = "MISSING";

/// Per-batch audit of unpopulated columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingValueReport {
    pub rows_checked: usize,
    pub rows_with_missing: usize,
    /// `"row_<n>"` (1-based) -> column -> `"MISSING"`. Complete rows are omitted.
    pub missing_details: BTreeMap<String, BTreeMap<String, String>>,
}

/// A value counts as populated when present and non-blank after trimming.
pub fn is_populated(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Schema columns the row has no populated value for, in schema order.
pub fn missing_columns(values: &BTreeMap<String, String>, schema: &TableSchema) -> Vec<String> {
    schema
        .columns
        .iter()
        .filter(|c| !is_populated(values.get(*c).map(String::as_str)))
        .cloned()
        .collect()
}

/// Recompute status and missing columns of `row` against `schema`.
pub fn validate_row(row: &mut MappedRow, schema: &TableSchema) {
    row.missing = missing_columns(&row.values, schema);
    row.status = if row.missing.is_empty() {
        RowStatus::Valid
    } else {
        RowStatus::Invalid
    };
}

/// Audit a batch for unpopulated columns. Never touches the store.
pub fn find_missing_values(rows: &[MappedRow], schema: &TableSchema) -> MissingValueReport {
    let mut missing_details = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        let missing = missing_columns(&row.values, schema);
        if missing.is_empty() {
            continue;
        }
        let detail = missing
            .into_iter()
            .map(|c| (c, MISSING.to_string()))
            .collect();
        missing_details.insert(format!("row_{}", i + 1), detail);
    }
    MissingValueReport {
        rows_checked: rows.len(),
        rows_with_missing: missing_details.len(),
        missing_details,
    }
}
