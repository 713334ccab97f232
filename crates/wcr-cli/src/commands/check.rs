use std::path::Path;
use wcr_core::error::WcrError;
use wcr_core::Engine;

use crate::output;
use crate::OutputFormat;

pub fn run(
    config_path: &Path,
    rows_path: &Path,
    table: &str,
    format: OutputFormat,
) -> Result<(), WcrError> {
    let config = super::config(config_path)?;
    let engine = Engine::from_config(&config)?;
    let rows = super::load_rows(rows_path)?;

    let report = engine.check_existence(&rows, table)?;

    match format {
        OutputFormat::Json => output::json::print(&report)?,
        OutputFormat::Table => output::table::print_existence(&report),
    }
    Ok(())
}
