//! Client for the LLM-assisted extraction and column-mapping service.
//!
//! The service speaks a small JSON protocol:
//!
//! - `POST {endpoint}/extract` with `{model, table, columns, image_png_base64}`
//!   answers `{"rows": [{"COLUMN": value, ...}, ...]}`.
//! - `POST {endpoint}/map-columns` with `{model, headers, columns}` answers
//!   `{"mappings": {"raw header": "COLUMN", ...}}`.

use crate::error::WcrError;
use crate::model::RawRecord;
use crate::registry::schema::TableSchema;
use base64::{engine::general_purpose, Engine as _};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

const SERVICE: &str = "assistant";

/// Structured extraction and header correspondence from an external model.
pub trait AssistService: Send + Sync {
    /// Rows read from a rendered region, keyed by whatever the model emits.
    fn extract_rows(&self, png: &[u8], schema: &TableSchema) -> Result<Vec<RawRecord>, WcrError>;

    /// Proposed `(raw header, canonical column)` pairs.
    fn map_columns(
        &self,
        unresolved: &[String],
        columns: &[String],
    ) -> Result<Vec<(String, String)>, WcrError>;
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    model: &'a str,
    table: &'a str,
    columns: &'a [String],
    image_png_base64: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    rows: Vec<IndexMap<String, serde_json::Value>>,
}

#[derive(Serialize)]
struct MapRequest<'a> {
    model: &'a str,
    headers: &'a [String],
    columns: &'a [String],
}

#[derive(Deserialize)]
struct MapResponse {
    #[serde(default)]
    mappings: BTreeMap<String, Option<String>>,
}

/// Blocking HTTP client with a bounded timeout and a single retry.
#[derive(Debug, Clone)]
pub struct HttpAssistant {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpAssistant {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, WcrError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WcrError::service_unavailable(SERVICE, e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, WcrError> {
        with_retry(path, || {
            let mut request = self
                .client
                .post(format!("{}/{}", self.endpoint, path))
                .json(body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }
            request
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.json::<R>())
                .map_err(|e| WcrError::service_unavailable(SERVICE, e.to_string()))
        })
    }
}

impl AssistService for HttpAssistant {
    fn extract_rows(&self, png: &[u8], schema: &TableSchema) -> Result<Vec<RawRecord>, WcrError> {
        let request = ExtractRequest {
            model: &self.model,
            table: &schema.name,
            columns: &schema.columns,
            image_png_base64: general_purpose::STANDARD.encode(png),
        };
        let response: ExtractResponse = self.post("extract", &request)?;
        Ok(response.rows.into_iter().map(stringify_row).collect())
    }

    fn map_columns(
        &self,
        unresolved: &[String],
        columns: &[String],
    ) -> Result<Vec<(String, String)>, WcrError> {
        let request = MapRequest {
            model: &self.model,
            headers: unresolved,
            columns,
        };
        let response: MapResponse = self.post("map-columns", &request)?;
        Ok(response
            .mappings
            .into_iter()
            .filter_map(|(raw, column)| column.map(|c| (raw, c)))
            .collect())
    }
}

/// Run `op`, retrying exactly once on failure.
fn with_retry<T>(what: &str, op: impl Fn() -> Result<T, WcrError>) -> Result<T, WcrError> {
    match op() {
        Ok(v) => Ok(v),
        Err(first) => {
            warn!(call = what, error = %first, "assistant call failed, retrying once");
            op()
        }
    }
}

/// Flatten JSON scalars to strings, dropping nulls and empty values.
fn stringify_row(row: IndexMap<String, serde_json::Value>) -> RawRecord {
    row.into_iter()
        .filter_map(|(k, v)| {
            let s = match v {
                serde_json::Value::Null => return None,
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some((k, s))
            }
        })
        .collect()
}
