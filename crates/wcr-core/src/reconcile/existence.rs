use crate::error::WcrError;
use crate::model::MappedRow;
use crate::reconcile::outcome::{ExistenceReport, MatchStatus};
use crate::registry::schema::TableSchema;
use crate::store::{CanonicalStore, RecordKey};
use tracing::debug;

/// Look one row up. Returns the status and, when complete, its key.
pub fn match_row(
    row: &MappedRow,
    schema: &TableSchema,
    store: &dyn CanonicalStore,
) -> Result<(MatchStatus, Option<RecordKey>), WcrError> {
    let key = match RecordKey::from_row(row, schema) {
        Ok(key) => key,
        Err(absent) => {
            debug!(table = %schema.name, ?absent, "key incomplete");
            return Ok((MatchStatus::KeyIncomplete, None));
        }
    };
    let status = if store.contains(schema, &key)? {
        MatchStatus::Found
    } else {
        MatchStatus::NotFound
    };
    Ok((status, Some(key)))
}

/// Partition `rows` by whether their key already exists in `store`.
pub fn check_existence(
    rows: &[MappedRow],
    schema: &TableSchema,
    store: &dyn CanonicalStore,
) -> Result<ExistenceReport, WcrError> {
    let mut exists = Vec::new();
    let mut missing = Vec::new();
    let mut key_incomplete = Vec::new();

    for row in rows {
        match match_row(row, schema, store)?.0 {
            MatchStatus::Found => exists.push(row.clone()),
            MatchStatus::NotFound => missing.push(row.clone()),
            MatchStatus::KeyIncomplete => key_incomplete.push(row.clone()),
        }
    }

    Ok(ExistenceReport::new(exists, missing, key_incomplete))
}
