pub mod check;
pub mod extract;
pub mod missing;
pub mod scan;
pub mod tables;

use std::path::Path;
use wcr_core::config::{load_config, Config};
use wcr_core::error::WcrError;
use wcr_core::model::MappedRow;

/// Parse `x,y,w,h`.
pub fn parse_quad(s: &str) -> Result<[f64; 4], String> {
    let v = parse_numbers(s, 4)?;
    Ok([v[0], v[1], v[2], v[3]])
}

/// Parse `width,height`.
pub fn parse_pair(s: &str) -> Result<[f64; 2], String> {
    let v = parse_numbers(s, 2)?;
    Ok([v[0], v[1]])
}

fn parse_numbers(s: &str, expected: usize) -> Result<Vec<f64>, String> {
    let values = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", part.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != expected {
        return Err(format!(
            "expected {expected} comma-separated numbers, got {}",
            values.len()
        ));
    }
    Ok(values)
}

pub fn config(path: &Path) -> Result<Config, WcrError> {
    let config = load_config(path)?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Read rows saved by `wcr extract --out`, or a bare JSON array of rows.
pub fn load_rows(path: &Path) -> Result<Vec<MappedRow>, WcrError> {
    let text = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let rows = match value {
        serde_json::Value::Object(mut map) if map.contains_key("rows") => {
            map.remove("rows").unwrap_or_default()
        }
        other => other,
    };
    Ok(serde_json::from_value(rows)?)
}
