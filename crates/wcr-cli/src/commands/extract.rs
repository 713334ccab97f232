use std::path::{Path, PathBuf};
use wcr_core::error::WcrError;
use wcr_core::model::Selection;
use wcr_core::region::{FractionalRegion, PreviewSelection, Viewport};
use wcr_core::Engine;

use crate::output;
use crate::OutputFormat;

pub struct Request {
    pub document: String,
    pub table: String,
    pub page: usize,
    pub region: Option<[f64; 4]>,
    pub selection: Option<[f64; 4]>,
    pub viewport: Option<[f64; 2]>,
    pub assisted: bool,
}

pub fn run(
    config_path: &Path,
    request: Request,
    format: OutputFormat,
    out: Option<PathBuf>,
) -> Result<(), WcrError> {
    let config = super::config(config_path)?;
    let engine = Engine::from_config(&config)?;

    let result = match (request.selection, request.viewport) {
        (Some([x, y, w, h]), Some([width, height])) => engine.extract_selection(
            &request.document,
            request.page,
            Viewport { width, height },
            PreviewSelection { x, y, w, h },
            &request.table,
            request.assisted,
        )?,
        _ => {
            let region = match request.region {
                Some([x, y, w, h]) => FractionalRegion::new(x, y, w, h)?,
                None => FractionalRegion::full_page(),
            };
            let selection = Selection {
                page: request.page,
                region,
                label: request.table.clone(),
                assisted: request.assisted,
            };
            engine.extract(&request.document, &selection)?
        }
    };

    match format {
        OutputFormat::Json => output::json::print(&result)?,
        OutputFormat::Table => output::table::print_extraction(&result),
    }

    if let Some(path) = out {
        std::fs::write(&path, serde_json::to_string_pretty(&result)?)?;
        eprintln!(
            "{} row(s) from {} written to {}",
            result.rows.len(),
            result.raw.strategy,
            path.display()
        );
    }

    Ok(())
}
