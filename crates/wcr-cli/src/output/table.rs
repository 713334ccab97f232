use wcr_core::model::{ExtractionOutput, MappedRow};
use wcr_core::reconcile::{ExistenceReport, ScanRecord, ScanReport};
use wcr_core::registry::TableRegistry;
use wcr_core::validate::MissingValueReport;

/// Fixed-width grid of `columns` over `rows`, blanks for absent values.
fn format_grid(columns: &[String], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r.get(i).map_or(0, |v| v.chars().count()))
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = grid_line(columns, &widths);
    out.push_str(&grid_line(&rule, &widths));
    for row in rows {
        out.push_str(&grid_line(row, &widths));
    }
    out
}

fn grid_line(cells: &[String], widths: &[usize]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    format!("{}\n", line.trim_end())
}

fn row_cells(row: &MappedRow, columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| row.value(c).unwrap_or("").to_string())
        .collect()
}

pub fn print_extraction(result: &ExtractionOutput) {
    println!(
        "Table: {}  Strategy: {}  Rows: {}\n",
        result.table,
        result.raw.strategy,
        result.rows.len()
    );

    if result.rows.is_empty() {
        println!("  No records found in the selected region.");
        if let Some(text) = &result.raw.raw_text {
            println!("\nText seen in the region:\n{text}");
        }
        return;
    }

    let mut columns = vec!["STATUS".to_string()];
    columns.extend(result.schema.iter().cloned());
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|r| {
            let mut cells = vec![r.status.to_string()];
            cells.extend(row_cells(r, &result.schema));
            cells
        })
        .collect();
    print!("{}", format_grid(&columns, &rows));

    for (i, row) in result.rows.iter().enumerate() {
        if !row.unmapped.is_empty() {
            let fields: Vec<String> = row
                .unmapped
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            println!("  row {}: unmapped {}", i + 1, fields.join(", "));
        }
    }
}

pub fn print_existence(report: &ExistenceReport) {
    println!(
        "Found: {}  Missing: {} (key incomplete: {})\n",
        report.found_count, report.missing_count, report.key_incomplete_count
    );
    let sections = [
        ("Already stored", &report.exists),
        ("New", &report.missing),
        ("Key incomplete", &report.key_incomplete),
    ];
    for (title, rows) in sections {
        if rows.is_empty() {
            continue;
        }
        println!("{title}:");
        for row in rows {
            let values: Vec<String> = row
                .values
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            println!("  {}", values.join(", "));
        }
        println!();
    }
}

pub fn print_missing(report: &MissingValueReport) {
    println!(
        "Rows checked: {}  Rows with missing values: {}\n",
        report.rows_checked, report.rows_with_missing
    );
    for (row, columns) in &report.missing_details {
        let names: Vec<&str> = columns.keys().map(String::as_str).collect();
        println!("  {row}: {}", names.join(", "));
    }
}

pub fn print_scan(report: &ScanReport) {
    println!(
        "Table: {}  Pages: {}  Records: {}  Matches: {}  New: {}\n",
        report.table,
        report.pages_scanned,
        report.total_records_found,
        report.database_matches,
        report.no_matches
    );
    if report.total_records_found == 0 {
        println!("  No records found.");
        return;
    }
    let columns: Vec<String> = ["PAGE", "BLOCK", "STATUS", "KEY"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut records: Vec<&ScanRecord> = report
        .matches
        .iter()
        .chain(&report.no_matches_data)
        .collect();
    records.sort_by_key(|r| (r.page, r.block));
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.page.to_string(),
                r.block.to_string(),
                r.status.to_string(),
                r.key.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print!("{}", format_grid(&columns, &rows));
}

pub fn print_tables(registry: &TableRegistry) {
    println!("Table registry (version {})\n", registry.version());
    for table in registry.tables() {
        println!("  {}", table.name);
        if let Some(desc) = &table.description {
            println!("    {desc}");
        }
        println!("    columns: {}", table.columns.join(", "));
        println!("    key:     {}", table.key_columns.join(", "));
        let labels = registry.labels_for(&table.name);
        if !labels.is_empty() {
            println!("    labels:  {}", labels.join(", "));
        }
        println!();
    }
}
