//! Read-only access to previously stored canonical records.

use crate::error::WcrError;
use crate::model::MappedRow;
use crate::registry;
use crate::registry::schema::TableSchema;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

/// Key of a row under its schema: one normalized value per key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RecordKey {
    values: Vec<String>,
}

/// SQL name of [`normalize_component`] on store connections.
const NORMALIZE_FN: &str = "wcr_normalize";

/// Trim and upper-case one key component. Plain decimals drop trailing
/// fractional zeros, so `1450`, `1450.0` and a stored REAL `1450` agree.
pub fn normalize_component(value: &str) -> String {
    let value = value.trim().to_uppercase();
    if let Some(decimal) = canonical_decimal(&value) {
        return decimal.to_string();
    }
    value
}

/// `value` without trailing fractional zeros, when it is a plain decimal.
fn canonical_decimal(value: &str) -> Option<&str> {
    let (int, frac) = value.split_once('.')?;
    let digits = int.strip_prefix('-').unwrap_or(int);
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(digits) || !all_digits(frac) {
        return None;
    }
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        Some(int)
    } else {
        Some(&value[..int.len() + 1 + frac.len()])
    }
}

impl RecordKey {
    /// Build the key of `row`. Returns the key columns that are absent or
    /// blank when the key is incomplete.
    pub fn from_row(row: &MappedRow, schema: &TableSchema) -> Result<Self, Vec<String>> {
        let mut values = Vec::with_capacity(schema.key_columns.len());
        let mut absent = Vec::new();
        for column in &schema.key_columns {
            match row.value(column).map(normalize_component) {
                Some(v) if !v.is_empty() => values.push(v),
                _ => absent.push(column.clone()),
            }
        }
        if absent.is_empty() {
            Ok(Self { values })
        } else {
            Err(absent)
        }
    }

    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            values: values
                .into_iter()
                .map(|v| normalize_component(v.as_ref()))
                .collect(),
        }
    }

    /// Components in key-column order.
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.values.join(" / "))
    }
}

/// Lookup of canonical records by key. Never writes.
pub trait CanonicalStore: Send + Sync {
    fn contains(&self, schema: &TableSchema, key: &RecordKey) -> Result<bool, WcrError>;
}

/// Canonical records in a SQLite database, one table per schema.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    tables: HashSet<String>,
}

impl SqliteStore {
    /// Open an existing database read-only.
    pub fn open(path: &Path) -> Result<Self, WcrError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        debug!(path = %path.display(), "opened canonical store");
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, WcrError> {
        register_normalize(&conn)?;

        let mut tables = HashSet::new();
        {
            let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
            for name in stmt.query_map([], |row| row.get::<_, String>(0))? {
                tables.insert(name?);
            }
        }

        for schema in registry::registry().tables() {
            if !tables.contains(&schema.name) {
                warn!(
                    table = %schema.name,
                    "table absent from canonical store; every record will be new"
                );
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
            tables,
        })
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains(table)
    }
}

impl CanonicalStore for SqliteStore {
    fn contains(&self, schema: &TableSchema, key: &RecordKey) -> Result<bool, WcrError> {
        if !self.has_table(&schema.name) {
            return Ok(false);
        }
        let predicate = schema
            .key_columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{NORMALIZE_FN}({}) = ?{}", quote_ident(c), i + 1))
            .collect::<Vec<_>>()
            .join(" AND ");
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} LIMIT 1",
            quote_ident(&schema.name),
            predicate
        );

        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let hit = conn
            .query_row(&sql, params_from_iter(key.values()), |_| Ok(()))
            .optional()?;
        Ok(hit.is_some())
    }
}

/// Expose [`normalize_component`] to SQL so stored values are compared
/// under the same rules as extracted ones.
fn register_normalize(conn: &Connection) -> Result<(), WcrError> {
    conn.create_scalar_function(
        NORMALIZE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = match ctx.get_raw(0) {
                ValueRef::Null | ValueRef::Blob(_) => return Ok(None),
                ValueRef::Integer(i) => i.to_string(),
                ValueRef::Real(f) => f.to_string(),
                ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
            };
            Ok(Some(normalize_component(&text)))
        },
    )?;
    Ok(())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Canonical keys held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: HashMap<String, HashSet<RecordKey>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: &str, key: RecordKey) {
        self.keys.entry(table.to_string()).or_default().insert(key);
    }
}

impl CanonicalStore for MemoryStore {
    fn contains(&self, schema: &TableSchema, key: &RecordKey) -> Result<bool, WcrError> {
        Ok(self
            .keys
            .get(&schema.name)
            .is_some_and(|keys| keys.contains(key)))
    }
}
