use std::path::Path;
use wcr_core::error::WcrError;
use wcr_core::reconcile::{CancelToken, ScanOptions};
use wcr_core::Engine;

use crate::output;
use crate::OutputFormat;

pub fn run(
    config_path: &Path,
    document: &str,
    table: &str,
    workers: Option<usize>,
    assisted: bool,
    format: OutputFormat,
) -> Result<(), WcrError> {
    let config = super::config(config_path)?;
    let options = ScanOptions {
        workers: workers.unwrap_or(config.scan.workers).max(1),
        assisted: assisted || config.scan.assisted,
    };
    let engine = Engine::from_config(&config)?.with_scan_options(options);

    let report = engine.scan_document_matches(document, table, &CancelToken::new())?;

    match format {
        OutputFormat::Json => output::json::print(&report)?,
        OutputFormat::Table => output::table::print_scan(&report),
    }
    Ok(())
}
