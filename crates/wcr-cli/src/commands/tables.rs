use wcr_core::error::WcrError;
use wcr_core::registry;

use crate::output;
use crate::OutputFormat;

pub fn run(format: OutputFormat) -> Result<(), WcrError> {
    let registry = registry::registry();
    match format {
        OutputFormat::Json => output::json::print(&registry.tables())?,
        OutputFormat::Table => output::table::print_tables(registry),
    }
    Ok(())
}
