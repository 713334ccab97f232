pub mod schema;

use crate::error::WcrError;
use schema::{RegistryDef, TableSchema};
use std::sync::LazyLock;

const WCR_TABLES_JSON: &str = include_str!("../../../../schemas/wcr-tables.json");

static REGISTRY: LazyLock<TableRegistry> = LazyLock::new(|| {
    let def: RegistryDef =
        serde_json::from_str(WCR_TABLES_JSON).expect("embedded wcr-tables.json is valid");
    TableRegistry::from_def(def).expect("embedded wcr-tables.json is consistent")
});

/// Get the built-in table registry.
pub fn registry() -> &'static TableRegistry {
    &REGISTRY
}

/// Resolve a label or table name against the built-in registry.
pub fn resolve(label: &str) -> Result<&'static TableSchema, WcrError> {
    REGISTRY.resolve(label)
}

/// Catalog of target schemas and the document labels that point at them.
#[derive(Debug, Clone)]
pub struct TableRegistry {
    version: String,
    tables: Vec<TableSchema>,
    labels: Vec<(String, String)>,
}

impl TableRegistry {
    /// Build a registry, checking that keys and labels reference known names.
    pub fn from_def(def: RegistryDef) -> Result<Self, WcrError> {
        for table in &def.tables {
            if table.columns.is_empty() {
                return Err(WcrError::SchemaUnknown(format!(
                    "{} (no columns defined)",
                    table.name
                )));
            }
            if table.key_columns.is_empty() {
                return Err(WcrError::SchemaUnknown(format!(
                    "{} (no key columns defined)",
                    table.name
                )));
            }
            if let Some(bad) = table.key_columns.iter().find(|k| !table.has_column(k)) {
                return Err(WcrError::SchemaUnknown(format!(
                    "{} (key column '{}' is not a column)",
                    table.name, bad
                )));
            }
        }

        let mut labels = Vec::with_capacity(def.labels.len());
        for (label, table) in def.labels {
            if !def.tables.iter().any(|t| t.name == table) {
                return Err(WcrError::SchemaUnknown(format!(
                    "{table} (referenced by label '{label}')"
                )));
            }
            labels.push((label.to_uppercase(), table));
        }

        Ok(Self {
            version: def.version,
            tables: def.tables,
            labels,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    /// Look up a schema by exact table name.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Resolve a document label ("CASING") or a table name ("wcr_casing"),
    /// case-insensitively.
    pub fn resolve(&self, label: &str) -> Result<&TableSchema, WcrError> {
        let wanted = label.trim().to_uppercase();
        let table_name = self
            .labels
            .iter()
            .find(|(l, _)| *l == wanted)
            .map(|(_, t)| t.as_str());

        let found = match table_name {
            Some(name) => self.table(name),
            None => self
                .tables
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(&wanted)),
        };

        found.ok_or_else(|| WcrError::SchemaUnknown(label.trim().to_string()))
    }

    /// Labels that resolve to the given table.
    pub fn labels_for(&self, table: &str) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|(_, t)| t == table)
            .map(|(l, _)| l.as_str())
            .collect()
    }
}
