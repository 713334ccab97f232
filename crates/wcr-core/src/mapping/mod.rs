//! Align raw field names onto a target schema.
//!
//! Each raw header is resolved by, in order:
//! 1. exact match against a column name (trimmed, case-insensitive),
//! 2. the static alias table, keyed on the compacted header,
//! 3. an optional mapping assistant, asked once per batch about whatever is
//!    still unresolved.
//!
//! Within a row a column is claimed by the first header that resolves to it,
//! preferring exact matches over aliases over assistant proposals. Headers
//! that lose a claim, or never resolve, are kept in the row's `unmapped`
//! audit map.

pub mod aliases;

use crate::extraction::assist::AssistService;
use crate::model::{MappedRow, RawRecord, RowStatus};
use crate::registry::schema::TableSchema;
use crate::validate::validate_row;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a header was resolved. Lower ranks claim columns first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Resolution {
    Exact,
    Alias,
    Assisted,
}

#[derive(Clone, Default)]
pub struct SchemaMapper {
    assistant: Option<Arc<dyn AssistService>>,
}

impl SchemaMapper {
    pub fn new(assistant: Option<Arc<dyn AssistService>>) -> Self {
        Self { assistant }
    }

    /// Map raw records onto `schema`, returning the rows and the schema's
    /// column list they are shaped to.
    pub fn map(
        &self,
        schema: &TableSchema,
        records: &[RawRecord],
    ) -> (Vec<MappedRow>, Vec<String>) {
        let resolved = self.resolve_headers(schema, records);

        let rows = records
            .iter()
            .map(|record| map_record(schema, record, &resolved))
            .collect();

        (rows, schema.columns.clone())
    }

    fn resolve_headers(
        &self,
        schema: &TableSchema,
        records: &[RawRecord],
    ) -> HashMap<String, (String, Resolution)> {
        let mut resolved = HashMap::new();
        let mut unresolved: Vec<String> = Vec::new();

        for header in records.iter().flat_map(|r| r.keys()) {
            if resolved.contains_key(header) || unresolved.contains(header) {
                continue;
            }
            match resolve_static(schema, header) {
                Some(hit) => {
                    resolved.insert(header.clone(), hit);
                }
                None => unresolved.push(header.clone()),
            }
        }

        if unresolved.is_empty() {
            return resolved;
        }
        let Some(assistant) = &self.assistant else {
            debug!(count = unresolved.len(), table = %schema.name, "headers left unmapped");
            return resolved;
        };

        match assistant.map_columns(&unresolved, &schema.columns) {
            Ok(proposals) => {
                for (header, column) in proposals {
                    let column = column.trim().to_uppercase();
                    if unresolved.contains(&header) && schema.has_column(&column) {
                        resolved.insert(header, (column, Resolution::Assisted));
                    } else {
                        debug!(%header, %column, "ignoring assistant proposal");
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, table = %schema.name, "column mapping assistant unavailable");
            }
        }
        resolved
    }
}

/// Resolve a header by exact name or alias, without outside help.
fn resolve_static(schema: &TableSchema, header: &str) -> Option<(String, Resolution)> {
    let wanted = header.trim();
    if let Some(column) = schema
        .columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case(wanted))
    {
        return Some((column.clone(), Resolution::Exact));
    }

    let compacted = aliases::compact(wanted);
    if compacted.is_empty() {
        return None;
    }
    if let Some(column) = schema
        .columns
        .iter()
        .find(|c| aliases::compact(c) == compacted)
    {
        return Some((column.clone(), Resolution::Alias));
    }
    aliases::candidates(&compacted)?
        .iter()
        .find(|c| schema.has_column(c))
        .map(|c| (c.to_string(), Resolution::Alias))
}

fn map_record(
    schema: &TableSchema,
    record: &RawRecord,
    resolved: &HashMap<String, (String, Resolution)>,
) -> MappedRow {
    let mut claims: Vec<(&str, &str, Resolution, &str)> = Vec::new();
    let mut unmapped = BTreeMap::new();

    for (header, value) in record {
        let value = value.trim();
        match resolved.get(header) {
            Some((column, how)) => claims.push((header.as_str(), column.as_str(), *how, value)),
            None => {
                unmapped.insert(header.clone(), value.to_string());
            }
        }
    }
    // Stable sort keeps record order within a rank.
    claims.sort_by_key(|(_, _, how, _)| *how);

    let mut values = BTreeMap::new();
    for (header, column, _, value) in claims {
        if value.is_empty() {
            continue;
        }
        if values.contains_key(column) {
            unmapped.insert(header.to_string(), value.to_string());
        } else {
            values.insert(column.to_string(), value.to_string());
        }
    }

    let mut row = MappedRow {
        table: schema.name.clone(),
        values,
        status: RowStatus::Invalid,
        missing: Vec::new(),
        unmapped,
    };
    validate_row(&mut row, schema);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WcrError;
    use crate::registry;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn record(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn audit(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    struct ScriptedAssistant {
        proposals: Vec<(String, String)>,
        asked: Mutex<Vec<Vec<String>>>,
    }

    impl AssistService for ScriptedAssistant {
        fn extract_rows(
            &self,
            _png: &[u8],
            _schema: &TableSchema,
        ) -> Result<Vec<RawRecord>, WcrError> {
            Ok(Vec::new())
        }

        fn map_columns(
            &self,
            unresolved: &[String],
            _columns: &[String],
        ) -> Result<Vec<(String, String)>, WcrError> {
            self.asked.lock().unwrap().push(unresolved.to_vec());
            Ok(self.proposals.clone())
        }
    }

    #[test]
    fn test_exact_and_alias_mapping() {
        let schema = registry::resolve("WELL_HEADER").unwrap();
        let (rows, columns) = SchemaMapper::default().map(
            schema,
            &[record(&[
                ("uwi", " AB-123 "),
                ("Well Name", "Test-1"),
                ("KB Elev", "312.4"),
                ("TD", "2875"),
                ("Rig", "Ensign 42"),
            ])],
        );
        assert_eq!(columns, schema.columns);
        let row = &rows[0];
        assert_eq!(row.value("UWI"), Some("AB-123"));
        assert_eq!(row.value("WELL_NAME"), Some("Test-1"));
        assert_eq!(row.value("KB_ELEVATION"), Some("312.4"));
        assert_eq!(row.value("TOTAL_DEPTH"), Some("2875"));
        assert_eq!(row.unmapped, audit(&[("Rig", "Ensign 42")]));
        assert_eq!(row.status, RowStatus::Invalid);
    }

    #[test]
    fn test_alias_depends_on_target_schema() {
        let survey = registry::resolve("DIRSRVY").unwrap();
        let swc = registry::resolve("SWC").unwrap();
        let raw = [record(&[("Depth", "1450")])];

        let (rows, _) = SchemaMapper::default().map(survey, &raw);
        assert_eq!(rows[0].value("MEASURED_DEPTH"), Some("1450"));

        let (rows, _) = SchemaMapper::default().map(swc, &raw);
        assert_eq!(rows[0].value("SAMPLE_DEPTH"), Some("1450"));
    }

    #[test]
    fn test_exact_match_wins_conflict() {
        let schema = registry::resolve("WELL_HEADER").unwrap();
        let (rows, _) = SchemaMapper::default().map(
            schema,
            &[record(&[("API No", "42-501-20130"), ("UWI", "AB-123")])],
        );
        assert_eq!(rows[0].value("UWI"), Some("AB-123"));
        assert_eq!(rows[0].unmapped, audit(&[("API No", "42-501-20130")]));
    }

    #[test]
    fn test_mapped_columns_subset_of_schema() {
        let schema = registry::resolve("CASING").unwrap();
        let (rows, _) = SchemaMapper::default().map(
            schema,
            &[record(&[
                ("field_0", "Surface"),
                ("Size", "13 3/8"),
                ("Grade", "J-55"),
                ("Colour", "red"),
            ])],
        );
        for column in rows[0].values.keys() {
            assert!(schema.has_column(column), "{column} not in schema");
        }
    }

    #[test]
    fn test_assistant_only_sees_unresolved_headers() {
        let schema = registry::resolve("HCSHOWS").unwrap();
        let assistant = Arc::new(ScriptedAssistant {
            proposals: vec![
                ("Fluor.".into(), "show_type".into()),
                ("Mud wt".into(), "MUD_WEIGHT".into()),
            ],
            asked: Mutex::new(Vec::new()),
        });
        let mapper = SchemaMapper::new(Some(assistant.clone()));

        let (rows, _) = mapper.map(
            schema,
            &[
                record(&[("UWI", "AB-123"), ("Fluor.", "bright yellow")]),
                record(&[("UWI", "AB-123"), ("Mud wt", "10.2")]),
            ],
        );

        let asked = assistant.asked.lock().unwrap();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0], vec!["Fluor.".to_string(), "Mud wt".to_string()]);

        assert_eq!(rows[0].value("SHOW_TYPE"), Some("bright yellow"));
        assert_eq!(rows[1].value("SHOW_TYPE"), None);
        assert_eq!(rows[1].unmapped, audit(&[("Mud wt", "10.2")]));
    }

    #[test]
    fn test_assistant_cannot_take_claimed_column() {
        let schema = registry::resolve("WELL_HEADER").unwrap();
        let assistant = Arc::new(ScriptedAssistant {
            proposals: vec![("Ident#".into(), "UWI".into())],
            asked: Mutex::new(Vec::new()),
        });
        let mapper = SchemaMapper::new(Some(assistant.clone()));

        let (rows, _) = mapper.map(schema, &[record(&[("Ident#", "X"), ("UWI", "AB-123")])]);

        assert_eq!(assistant.asked.lock().unwrap()[0], vec!["Ident#".to_string()]);
        assert_eq!(rows[0].value("UWI"), Some("AB-123"));
        assert_eq!(rows[0].unmapped, audit(&[("Ident#", "X")]));
    }

    #[test]
    fn test_first_header_in_page_order_wins_alias_tie() {
        let schema = registry::resolve("WELL_HEADER").unwrap();
        let (rows, _) = SchemaMapper::default().map(
            schema,
            &[record(&[("Well Name", "Test-1"), ("WELLNAME", "Other")])],
        );
        assert_eq!(rows[0].value("WELL_NAME"), Some("Test-1"));
        assert_eq!(rows[0].unmapped, audit(&[("WELLNAME", "Other")]));
    }

    #[test]
    fn test_unresolved_blank_field_kept_in_audit() {
        let schema = registry::resolve("SWC").unwrap();
        let (rows, _) = SchemaMapper::default().map(
            schema,
            &[record(&[("UWI", "AB-123"), ("Porosity", "  ")])],
        );
        assert_eq!(rows[0].unmapped, audit(&[("Porosity", "")]));
    }

    #[test]
    fn test_assistant_not_called_when_everything_resolves() {
        let schema = registry::resolve("SWC").unwrap();
        let assistant = Arc::new(ScriptedAssistant {
            proposals: Vec::new(),
            asked: Mutex::new(Vec::new()),
        });
        let mapper = SchemaMapper::new(Some(assistant.clone()));
        mapper.map(schema, &[record(&[("UWI", "AB-123"), ("Lith", "Sand")])]);
        assert!(assistant.asked.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let schema = registry::resolve("LOGS").unwrap();
        let (rows, columns) = SchemaMapper::default().map(schema, &[]);
        assert!(rows.is_empty());
        assert_eq!(columns.len(), schema.columns.len());
    }
}
