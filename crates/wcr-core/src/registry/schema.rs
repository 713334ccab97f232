use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Target schema for one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Canonical column names, in display order.
    pub columns: Vec<String>,
    /// Primary or composite key. Every entry is also in `columns`.
    pub key_columns: Vec<String>,
}

impl TableSchema {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// On-disk shape of the embedded registry file.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryDef {
    pub version: String,
    pub tables: Vec<TableSchema>,
    /// Document label (e.g. "CASING") -> table name.
    pub labels: BTreeMap<String, String>,
}
